//! `ceph-exporter serve`: periodic scraping plus the HTTP front end.

use anyhow::{Context, Result};
use clap::Args;

use cephex_daemon::start_blocking;

use crate::settings::ConfigArgs;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {}

impl ServeArgs {
    pub fn run(self, config: &ConfigArgs) -> Result<()> {
        let exporter_config = config.resolve()?;
        start_blocking(exporter_config, config.log_json).context("exporter exited with error")
    }
}
