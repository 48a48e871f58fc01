//! `ceph-exporter scrape`: one cycle, printed to stdout.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use cephex_collector::Collector;
use cephex_daemon::init_tracing;

use crate::settings::ConfigArgs;

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Print a one-line summary to stderr after the metrics.
    #[arg(long)]
    pub summary: bool,
}

impl ScrapeArgs {
    pub fn run(self, config: &ConfigArgs) -> Result<()> {
        let exporter_config = config.resolve()?;
        init_tracing(config.log_json);

        let report = Collector::new(exporter_config).collect();
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(report.text.as_bytes())
            .and_then(|()| stdout.flush())
            .context("failed to write metrics to stdout")?;

        if self.summary {
            eprintln!(
                "{}/{} daemons scraped, {} metrics, {} ms",
                report.daemons_ok,
                report.daemons_total,
                report.metrics,
                report.elapsed.as_millis(),
            );
        }
        Ok(())
    }
}
