//! Configuration flags shared by every subcommand.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args};

use cephex_core::config::load_or_default;
use cephex_core::ExporterConfig;

/// Flags override the `--config` file, which overrides built-in defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// YAML configuration file.
    #[arg(long, global = true, env = "CEPH_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the daemons' admin sockets.
    #[arg(long, global = true, env = "CEPH_EXPORTER_SOCK_DIR")]
    pub sock_dir: Option<PathBuf>,

    /// Address the HTTP server binds to.
    #[arg(long = "addrs", global = true, env = "CEPH_EXPORTER_ADDRS")]
    pub addr: Option<IpAddr>,

    /// Port the HTTP server binds to.
    #[arg(long, global = true, env = "CEPH_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Only counters with priority at or above this are exported.
    #[arg(long, global = true, env = "CEPH_EXPORTER_PRIO_LIMIT")]
    pub prio_limit: Option<i64>,

    /// Seconds to wait between scrape cycles.
    #[arg(long = "stats-period", global = true, env = "CEPH_EXPORTER_STATS_PERIOD")]
    pub stats_period_secs: Option<u64>,

    /// Group samples by metric name (true) or emit one block per sample (false).
    #[arg(long, global = true, action = ArgAction::Set, env = "CEPH_EXPORTER_SORT_METRICS")]
    pub sort_metrics: Option<bool>,

    /// Root of the process accounting filesystem.
    #[arg(long, global = true, env = "CEPH_EXPORTER_PROC_PATH")]
    pub proc_path: Option<PathBuf>,

    /// Daemon-name substring never scraped (repeatable or comma-separated;
    /// replaces the defaults).
    #[arg(long, global = true, value_delimiter = ',', env = "CEPH_EXPORTER_EXCLUDE")]
    pub exclude: Vec<String>,

    /// Seconds before an admin-socket request times out.
    #[arg(long = "asok-timeout", global = true, env = "CEPH_EXPORTER_ASOK_TIMEOUT")]
    pub asok_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "CEPH_EXPORTER_LOG_JSON")]
    pub log_json: bool,
}

impl ConfigArgs {
    /// Resolve the effective configuration.
    pub fn resolve(&self) -> Result<ExporterConfig> {
        let mut config = load_or_default(self.config.as_deref())
            .context("failed to load configuration file")?;
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut ExporterConfig) {
        if let Some(sock_dir) = &self.sock_dir {
            config.sock_dir = sock_dir.clone();
        }
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(prio_limit) = self.prio_limit {
            config.prio_limit = prio_limit;
        }
        if let Some(period) = self.stats_period_secs {
            config.stats_period_secs = period;
        }
        if let Some(sorted) = self.sort_metrics {
            config.sort_metrics = sorted;
        }
        if let Some(proc_path) = &self.proc_path {
            config.proc_path = proc_path.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(timeout) = self.asok_timeout_secs {
            config.asok_timeout_secs = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn flags_override_file_which_overrides_defaults() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("exporter.yaml");
        fs::write(&path, "port: 9100\nprio_limit: 3\nsort_metrics: false\n").expect("config");

        let args = ConfigArgs {
            config: Some(path),
            prio_limit: Some(8),
            ..ConfigArgs::default()
        };
        let config = args.resolve().expect("resolve");
        assert_eq!(config.port, 9100);
        assert_eq!(config.prio_limit, 8);
        assert!(!config.sort_metrics);
        assert_eq!(config.stats_period_secs, 5);
    }

    #[test]
    fn explicit_exclude_replaces_defaults() {
        let args = ConfigArgs {
            exclude: vec!["mon".to_string()],
            ..ConfigArgs::default()
        };
        assert_eq!(args.resolve().expect("resolve").exclude, vec!["mon".to_string()]);
    }

    #[test]
    fn zero_period_is_rejected() {
        let args = ConfigArgs {
            stats_period_secs: Some(0),
            ..ConfigArgs::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration"));
    }
}
