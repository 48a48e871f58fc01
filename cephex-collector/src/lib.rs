//! # cephex-collector
//!
//! One scrape cycle: discover daemons, pull counter schema and dump from each,
//! merge them into labelled metrics, sample process accounting, render.
//!
//! Call [`Collector::collect`] once per cycle. It never fails as a whole:
//! per-daemon problems are logged and counted in the [`CycleReport`].

pub mod counters;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod process;
pub mod schema;

pub use counters::{merge_counters, MergeStats};
pub use error::{CollectError, ParseError};
pub use pipeline::{scrape_daemon, Collector, CycleReport, DaemonScrape};
