//! cephex core library: domain types, exporter configuration, naming rules.
//!
//! Public API surface:
//! - [`types`]: daemon names and exposition label sets
//! - [`config`]: [`ExporterConfig`] and YAML loading
//! - [`naming`]: metric-name normalization and label-value quoting
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::ExporterConfig;
pub use error::ConfigError;
pub use types::{DaemonName, LabelSet};
