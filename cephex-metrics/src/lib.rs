//! # cephex-metrics
//!
//! Accumulates samples into named metrics and renders the exposition text
//! served on `/metrics`.
//!
//! ## Usage
//!
//! ```rust
//! use cephex_core::LabelSet;
//! use cephex_metrics::{MetricKind, MetricsBuilder, SampleValue};
//!
//! let mut builder = MetricsBuilder::new(true);
//! builder.add(
//!     SampleValue::Int(7),
//!     "osd_op",
//!     "Client operations",
//!     MetricKind::Counter,
//!     LabelSet::new().with("ceph_daemon", "osd.0"),
//! );
//! assert!(builder.dump().contains(r#"osd_op{ceph_daemon="osd.0"} 7"#));
//! ```

pub mod builder;
pub mod metric;

pub use builder::{MetricsBuilder, OrderedBuilder, UnorderedBuilder};
pub use metric::{Metric, MetricKind, SampleValue};
