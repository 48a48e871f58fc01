//! Merge a daemon's counter schema with its counter dump into metrics.
//!
//! For every schema group `g`, entry `i` of the schema describes entry `i`
//! of the dump. Each counter `c` at or above the priority threshold becomes
//! one sample named `promethize(g_c)`, or two for running averages:
//!
//! ```text
//! <name>_count   counter        "<description> Count"   avgcount
//! <name>_sum     <metric_type>  "<description> Total"   sum
//! ```
//!
//! Labels are built afresh for every counter from the schema entry's labels,
//! the daemon labels of [`extra_labels`], and the fixed-name rewrite. A
//! schema label keeps its value when a derived label shares its name.

use cephex_core::naming::promethize;
use cephex_core::{DaemonName, LabelSet};
use cephex_metrics::{MetricKind, MetricsBuilder};

use crate::labels::{extra_labels, fixed_name_metric};
use crate::schema::{label_text, CounterDump, CounterInfo, CounterSchema, CounterValue};

/// Per-daemon bookkeeping for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Samples handed to the builder.
    pub exported: usize,
    /// Counters below the priority threshold.
    pub filtered: usize,
    /// Counters skipped because the dump did not match the schema or the
    /// daemon name could not be labelled.
    pub dropped: usize,
}

/// Add every eligible counter of `daemon` to `builder`.
pub fn merge_counters(
    daemon: &DaemonName,
    schema: &CounterSchema,
    dump: &CounterDump,
    prio_limit: i64,
    builder: &mut MetricsBuilder,
) -> MergeStats {
    let mut stats = MergeStats::default();
    let daemon_labels = extra_labels(daemon);
    if daemon_labels.is_none() {
        tracing::debug!(daemon = %daemon, "unable to derive instance id, dropping counters");
    }

    for (group, schema_entries) in schema {
        let Some(dump_entries) = dump.get(group) else {
            tracing::debug!(daemon = %daemon, group, "group missing from counter dump");
            stats.dropped += schema_entries.iter().map(|e| e.counters.len()).sum::<usize>();
            continue;
        };
        if dump_entries.len() != schema_entries.len() {
            tracing::debug!(
                daemon = %daemon,
                group,
                schema = schema_entries.len(),
                dump = dump_entries.len(),
                "schema and dump entry counts differ",
            );
        }

        for (index, schema_entry) in schema_entries.iter().enumerate() {
            let dump_entry = dump_entries.get(index);
            let mut entry_labels = LabelSet::new();
            for (name, value) in &schema_entry.labels {
                entry_labels.insert(name.clone(), &label_text(value));
            }

            for (counter, info) in &schema_entry.counters {
                if info.priority < prio_limit {
                    stats.filtered += 1;
                    continue;
                }
                let Some(daemon_labels) = &daemon_labels else {
                    stats.dropped += 1;
                    continue;
                };
                let value = dump_entry
                    .and_then(|entry| entry.counters.get(counter))
                    .and_then(|raw| CounterValue::from_json(info, raw));
                let Some(value) = value else {
                    tracing::debug!(daemon = %daemon, group, counter, "counter value missing or malformed");
                    stats.dropped += 1;
                    continue;
                };

                let mut labels = entry_labels.clone();
                labels.extend_missing(daemon_labels);
                let raw_name = format!("{group}_{counter}");
                let name = match fixed_name_metric(&raw_name) {
                    Some((fixed_labels, fixed_name)) => {
                        labels.extend_missing(&fixed_labels);
                        promethize(&fixed_name)
                    }
                    None => promethize(&raw_name),
                };

                stats.exported += emit(builder, &name, info, value, labels);
            }
        }
    }
    stats
}

/// Returns the number of samples added.
fn emit(
    builder: &mut MetricsBuilder,
    name: &str,
    info: &CounterInfo,
    value: CounterValue,
    labels: LabelSet,
) -> usize {
    let kind = MetricKind::from_schema(&info.metric_type);
    match value {
        CounterValue::Scalar(sample) => {
            builder.add(sample, name, &info.description, kind, labels);
            1
        }
        CounterValue::Average { count, sum } => {
            builder.add(
                count,
                &format!("{name}_count"),
                &format!("{} Count", info.description),
                MetricKind::Counter,
                labels.clone(),
            );
            builder.add(
                sum,
                &format!("{name}_sum"),
                &format!("{} Total", info.description),
                kind,
                labels,
            );
            2
        }
    }
}
