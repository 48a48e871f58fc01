//! Exporter runtime: periodic scrape task + HTTP front end.

mod error;
pub mod http;
mod runtime;
pub mod snapshot;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_until, start_blocking, Exporter};
pub use snapshot::SnapshotStore;
