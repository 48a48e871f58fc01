//! A single exposition metric and its samples.

use std::fmt;

use cephex_core::LabelSet;

/// The `# TYPE` of a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Untyped,
    /// Any other kind a daemon schema declares, passed through verbatim.
    Other(String),
}

impl MetricKind {
    /// Map a schema `metric_type` string onto a kind.
    pub fn from_schema(raw: &str) -> Self {
        match raw {
            "gauge" => MetricKind::Gauge,
            "counter" => MetricKind::Counter,
            "histogram" => MetricKind::Histogram,
            "untyped" | "" => MetricKind::Untyped,
            other => MetricKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
            MetricKind::Histogram => f.write_str("histogram"),
            MetricKind::Untyped => f.write_str("untyped"),
            MetricKind::Other(raw) => f.write_str(raw),
        }
    }
}

/// A sample value, keeping the integer/float distinction of its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SampleValue::Int(v) => write!(f, "{v}"),
            SampleValue::UInt(v) => write!(f, "{v}"),
            SampleValue::Float(v) if v.is_nan() => f.write_str("NaN"),
            SampleValue::Float(v) if v.is_infinite() => {
                f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" })
            }
            SampleValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for SampleValue {
    fn from(v: i64) -> Self {
        SampleValue::Int(v)
    }
}

impl From<u64> for SampleValue {
    fn from(v: u64) -> Self {
        SampleValue::UInt(v)
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue::Float(v)
    }
}

/// A named metric with every sample appended to it this cycle.
///
/// Label sets are not deduplicated: each [`Metric::add`] is a new line.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    pub description: String,
    pub entries: Vec<(LabelSet, SampleValue)>,
}

impl Metric {
    pub fn new(name: impl Into<String>, kind: MetricKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, labels: LabelSet, value: SampleValue) {
        self.entries.push((labels, value));
    }

    /// Render the `# HELP`/`# TYPE` header and one line per entry.
    ///
    /// Entries are joined by `\n`; there is no newline after the last one.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# HELP {name} {desc}\n# TYPE {name} {kind}\n",
            name = self.name,
            desc = self.description,
            kind = self.kind
        );
        for (i, (labels, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{}{{{labels}}} {value}", self.name));
        }
        out
    }
}
