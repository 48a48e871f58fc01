//! Ordered and unordered metric builders.
//!
//! Both accept the same `add` calls; they differ only in how repeated names
//! are laid out in the rendered document:
//!
//! ```text
//! Ordered                       Unordered
//! # HELP foo ..                 # HELP foo ..
//! # TYPE foo ..                 # TYPE foo ..
//! foo{a="1"} 1                  foo{a="1"} 1
//! foo{a="2"} 2
//!                               # HELP foo ..
//!                               # TYPE foo ..
//!                               foo{a="2"} 2
//! ```

use std::collections::BTreeMap;

use cephex_core::LabelSet;

use crate::metric::{Metric, MetricKind, SampleValue};

/// Metrics kept in name order; one block per name.
#[derive(Debug, Default)]
pub struct OrderedBuilder {
    metrics: BTreeMap<String, Metric>,
}

impl OrderedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. The first `add` for a name fixes its kind and description.
    pub fn add(
        &mut self,
        value: SampleValue,
        name: &str,
        description: &str,
        kind: MetricKind,
        labels: LabelSet,
    ) {
        self.metrics
            .entry(name.to_string())
            .or_insert_with(|| Metric::new(name, kind, description))
            .add(labels, value);
    }

    /// Every metric block followed by a newline, sorted by metric name.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for metric in self.metrics.values() {
            out.push_str(&metric.render());
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Every `add` rendered immediately as its own block, in call order.
#[derive(Debug, Default)]
pub struct UnorderedBuilder {
    out: String,
    blocks: usize,
}

impl UnorderedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        value: SampleValue,
        name: &str,
        description: &str,
        kind: MetricKind,
        labels: LabelSet,
    ) {
        let mut metric = Metric::new(name, kind, description);
        metric.add(labels, value);
        self.out.push_str(&metric.render());
        self.out.push_str("\n\n");
        self.blocks += 1;
    }

    pub fn dump(&self) -> String {
        self.out.clone()
    }

    pub fn len(&self) -> usize {
        self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }
}

/// The builder strategy for one scrape cycle, chosen from configuration.
#[derive(Debug)]
pub enum MetricsBuilder {
    Ordered(OrderedBuilder),
    Unordered(UnorderedBuilder),
}

impl MetricsBuilder {
    /// `sorted == true` selects [`OrderedBuilder`].
    pub fn new(sorted: bool) -> Self {
        if sorted {
            MetricsBuilder::Ordered(OrderedBuilder::new())
        } else {
            MetricsBuilder::Unordered(UnorderedBuilder::new())
        }
    }

    pub fn add(
        &mut self,
        value: impl Into<SampleValue>,
        name: &str,
        description: &str,
        kind: MetricKind,
        labels: LabelSet,
    ) {
        let value = value.into();
        match self {
            MetricsBuilder::Ordered(b) => b.add(value, name, description, kind, labels),
            MetricsBuilder::Unordered(b) => b.add(value, name, description, kind, labels),
        }
    }

    pub fn dump(&self) -> String {
        match self {
            MetricsBuilder::Ordered(b) => b.dump(),
            MetricsBuilder::Unordered(b) => b.dump(),
        }
    }

    /// Number of rendered blocks so far (distinct names when ordered).
    pub fn len(&self) -> usize {
        match self {
            MetricsBuilder::Ordered(b) => b.len(),
            MetricsBuilder::Unordered(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, MetricsBuilder::Ordered(_))
    }
}
