//! `ceph-exporter daemons`: what a scrape cycle would talk to.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cephex_asok::{AdminSocket, DaemonRegistry};
use cephex_daemon::init_tracing;

use crate::settings::ConfigArgs;

#[derive(Args, Debug)]
pub struct DaemonsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DaemonJson {
    name: String,
    socket: String,
    reachable: bool,
}

#[derive(Tabled)]
struct DaemonTableRow {
    #[tabled(rename = "daemon")]
    name: String,
    #[tabled(rename = "socket")]
    socket: String,
    #[tabled(rename = "ping")]
    ping: String,
}

impl DaemonsArgs {
    pub fn run(self, config: &ConfigArgs) -> Result<()> {
        let exporter_config = config.resolve()?;
        init_tracing(config.log_json);

        let mut registry = DaemonRegistry::from_config(&exporter_config);
        registry.refresh();
        let daemons: Vec<DaemonJson> = registry
            .handles()
            .map(|handle| DaemonJson {
                name: handle.name.to_string(),
                socket: handle.path.display().to_string(),
                reachable: handle.socket.ping(),
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&daemons).context("failed to serialize daemon JSON")?
            );
            return Ok(());
        }

        println!(
            "{} daemons in {}",
            daemons.len(),
            registry.sock_dir().display()
        );
        if daemons.is_empty() {
            return Ok(());
        }
        let rows: Vec<DaemonTableRow> = daemons
            .into_iter()
            .map(|d| DaemonTableRow {
                name: d.name,
                socket: d.socket,
                ping: if d.reachable {
                    "ok".green().to_string()
                } else {
                    "down".red().to_string()
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
