//! ceph-exporter: serves Ceph daemon perf counters in the Prometheus text format.
//!
//! # Usage
//!
//! ```text
//! ceph-exporter [serve] [--sock-dir <dir>] [--addrs <ip>] [--port <port>] [--prio-limit <n>]
//!                       [--stats-period <secs>] [--sort-metrics <bool>] [--config <file>]
//! ceph-exporter scrape  [flags]
//! ceph-exporter daemons [--json] [flags]
//! ```

mod commands;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemons::DaemonsArgs, scrape::ScrapeArgs, serve::ServeArgs};
use settings::ConfigArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ceph-exporter",
    version,
    about = "Export Ceph daemon perf counters over HTTP",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape periodically and serve /metrics (the default).
    Serve(ServeArgs),

    /// Run one scrape cycle and print the exposition text.
    Scrape(ScrapeArgs),

    /// List the daemons found in the socket directory.
    Daemons(DaemonsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => ServeArgs::default().run(&cli.config),
        Some(Commands::Serve(args)) => args.run(&cli.config),
        Some(Commands::Scrape(args)) => args.run(&cli.config),
        Some(Commands::Daemons(args)) => args.run(&cli.config),
    }
}
