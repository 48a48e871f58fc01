//! Exporter configuration.
//!
//! # Sources
//!
//! ```text
//! defaults  <  YAML file (--config)  <  CLI flags / CEPH_EXPORTER_* env
//! ```
//!
//! This module owns the first two layers; the CLI applies its own overrides on
//! top of whatever [`load_config_at`] returns.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SOCK_DIR: &str = "/var/run/ceph/";
pub const DEFAULT_PORT: u16 = 9926;
pub const DEFAULT_PRIO_LIMIT: i64 = 5;
pub const DEFAULT_STATS_PERIOD_SECS: u64 = 5;
pub const DEFAULT_PROC_PATH: &str = "/proc";
pub const DEFAULT_ASOK_TIMEOUT_SECS: u64 = 5;

/// Daemon-name substrings that are never scraped: the manager and ourselves.
pub const DEFAULT_EXCLUDE: [&str; 2] = ["mgr", "ceph-exporter"];

/// The fixed configuration object consumed by the scrape engine and HTTP front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExporterConfig {
    /// Directory holding the daemons' `*.asok` control sockets.
    pub sock_dir: PathBuf,
    /// HTTP bind address.
    pub addr: IpAddr,
    /// HTTP bind port.
    pub port: u16,
    /// Counters with a schema priority below this value are not exported.
    pub prio_limit: i64,
    /// Seconds to wait after one scrape cycle completes before starting the next.
    pub stats_period_secs: u64,
    /// `true` selects the name-sorted builder, `false` the insertion-ordered one.
    pub sort_metrics: bool,
    /// Root of the OS process accounting tree.
    pub proc_path: PathBuf,
    /// Daemon-name substrings excluded from discovery.
    pub exclude: Vec<String>,
    /// Read/write timeout applied to each admin-socket request.
    pub asok_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            sock_dir: PathBuf::from(DEFAULT_SOCK_DIR),
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            prio_limit: DEFAULT_PRIO_LIMIT,
            stats_period_secs: DEFAULT_STATS_PERIOD_SECS,
            sort_metrics: true,
            proc_path: PathBuf::from(DEFAULT_PROC_PATH),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            asok_timeout_secs: DEFAULT_ASOK_TIMEOUT_SECS,
        }
    }
}

impl ExporterConfig {
    pub fn stats_period(&self) -> Duration {
        Duration::from_secs(self.stats_period_secs)
    }

    pub fn asok_timeout(&self) -> Duration {
        Duration::from_secs(self.asok_timeout_secs)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "stats_period_secs must be at least 1".to_string(),
            ));
        }
        if self.sock_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("sock_dir must not be empty".to_string()));
        }
        if self.asok_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "asok_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a config file; absent keys take their default values.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_config_at(path: &Path) -> Result<ExporterConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file is a valid "all defaults" config.
    if contents.trim().is_empty() {
        return Ok(ExporterConfig::default());
    }
    let config: ExporterConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// [`load_config_at`] when a path is given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<ExporterConfig, ConfigError> {
    match path {
        Some(path) => load_config_at(path),
        None => Ok(ExporterConfig::default()),
    }
}
