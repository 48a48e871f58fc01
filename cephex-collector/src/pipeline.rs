//! One scrape cycle from discovery to rendered text.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use cephex_asok::{
    asok_command, pid_file_path, AdminSocket, DaemonHandle, DaemonRegistry, COUNTER_DUMP,
    COUNTER_SCHEMA, CONFIG_SHOW,
};
use cephex_core::{DaemonName, ExporterConfig, LabelSet};
use cephex_metrics::{MetricKind, MetricsBuilder};

use crate::counters::{merge_counters, MergeStats};
use crate::error::CollectError;
use crate::process::{add_process_metrics, read_pid_file, ProcessSample};
use crate::schema::{CounterDump, CounterSchema};

/// Result of scraping one daemon's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonScrape {
    pub stats: MergeStats,
    /// Pid read from the daemon's pid file, when it has one.
    pub pid: Option<u32>,
}

/// Outcome of one [`Collector::collect`].
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The rendered exposition document.
    pub text: String,
    pub daemons_total: usize,
    pub daemons_ok: usize,
    /// Distinct metric blocks (ordered) or blocks written (unordered).
    pub metrics: usize,
    /// Time spent on discovery and counter retrieval.
    pub elapsed: Duration,
}

/// Owns the daemon registry and runs scrape cycles against it.
#[derive(Debug)]
pub struct Collector {
    config: ExporterConfig,
    registry: DaemonRegistry,
    hostname: String,
}

impl Collector {
    pub fn new(config: ExporterConfig) -> Self {
        let registry = DaemonRegistry::from_config(&config);
        let hostname = hostname(&config.proc_path);
        Self {
            config,
            registry,
            hostname,
        }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn registry(&self) -> &DaemonRegistry {
        &self.registry
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Rediscover daemons, scrape each one, and render a fresh document.
    pub fn collect(&mut self) -> CycleReport {
        let started = Instant::now();
        let mut builder = MetricsBuilder::new(self.config.sort_metrics);

        let total = self.registry.refresh();
        let mut ok = 0;
        let mut pids: Vec<(DaemonName, u32)> = Vec::new();
        for handle in self.registry.handles() {
            match scrape_daemon(handle, self.config.prio_limit, &mut builder) {
                Ok(scrape) => {
                    ok += 1;
                    tracing::trace!(
                        daemon = %handle.name,
                        exported = scrape.stats.exported,
                        filtered = scrape.stats.filtered,
                        dropped = scrape.stats.dropped,
                        "daemon scraped",
                    );
                    if let Some(pid) = scrape.pid {
                        pids.push((handle.name.clone(), pid));
                    }
                }
                Err(err) => {
                    tracing::debug!(daemon = %handle.name, error = %err, "daemon skipped this cycle");
                }
            }
        }
        let elapsed = started.elapsed();
        tracing::debug!(
            succeeded = ok,
            total,
            elapsed_ms = elapsed.as_millis() as u64,
            "perf counters retrieved",
        );

        builder.add(
            elapsed.as_secs_f64() * 1000.0,
            "ceph_exporter_scrape_time",
            "Time spent scraping and transforming perf counters to metrics",
            MetricKind::Gauge,
            LabelSet::new()
                .with("host", &self.hostname)
                .with("function", "collect"),
        );

        for (daemon, pid) in &pids {
            match ProcessSample::read(&self.config.proc_path, *pid) {
                Ok(sample) => add_process_metrics(&mut builder, daemon, &sample),
                Err(err) => {
                    tracing::warn!(daemon = %daemon, pid, error = %err, "process stats unavailable");
                }
            }
        }

        CycleReport {
            text: builder.dump(),
            daemons_total: total,
            daemons_ok: ok,
            metrics: builder.len(),
            elapsed,
        }
    }
}

/// Ping one daemon, merge its counters into `builder`, and look up its pid.
///
/// Any failure before the merge leaves `builder` untouched. A failed pid
/// lookup only costs the process metrics.
pub fn scrape_daemon<S: AdminSocket>(
    handle: &DaemonHandle<S>,
    prio_limit: i64,
    builder: &mut MetricsBuilder,
) -> Result<DaemonScrape, CollectError> {
    let daemon = &handle.name;
    if !handle.socket.ping() {
        tracing::warn!(daemon = %daemon, socket = %handle.path.display(), "daemon did not answer ping");
        return Err(CollectError::Unreachable {
            daemon: daemon.clone(),
        });
    }

    let dump = asok_command(&handle.socket, daemon, COUNTER_DUMP)?;
    let schema = asok_command(&handle.socket, daemon, COUNTER_SCHEMA)?;
    let dump: CounterDump = decode(daemon, COUNTER_DUMP, dump)?;
    let schema: CounterSchema = decode(daemon, COUNTER_SCHEMA, schema)?;

    let stats = merge_counters(daemon, &schema, &dump, prio_limit, builder);
    let pid = lookup_pid(handle);
    Ok(DaemonScrape { stats, pid })
}

fn decode<T: serde::de::DeserializeOwned>(
    daemon: &DaemonName,
    command: &'static str,
    value: serde_json::Value,
) -> Result<T, CollectError> {
    serde_json::from_value(value).map_err(|source| {
        tracing::warn!(daemon = %daemon, command, error = %source, "unexpected reply structure");
        CollectError::Shape {
            daemon: daemon.clone(),
            command,
            source,
        }
    })
}

fn lookup_pid<S: AdminSocket>(handle: &DaemonHandle<S>) -> Option<u32> {
    let config = asok_command(&handle.socket, &handle.name, CONFIG_SHOW).ok()?;
    let Some(path) = pid_file_path(&config) else {
        tracing::debug!(daemon = %handle.name, "no pid_file configured");
        return None;
    };
    match read_pid_file(&path) {
        Ok(pid) => Some(pid),
        Err(err) => {
            tracing::warn!(daemon = %handle.name, error = %err, "unable to read pid file");
            None
        }
    }
}

/// Host name for the scrape-time metric.
///
/// Read from `<proc_path>/sys/kernel/hostname`, falling back to the
/// `hostname` command and finally to an empty string.
pub fn hostname(proc_path: &Path) -> String {
    let path: PathBuf = proc_path.join("sys/kernel/hostname");
    if let Ok(name) = fs::read_to_string(&path) {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    match Command::new("hostname").output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => {
            tracing::debug!("unable to determine hostname");
            String::new()
        }
    }
}
