use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use cephex_collector::{Collector, CycleReport};
use cephex_core::ExporterConfig;

use crate::error::{io_err, DaemonError};
use crate::http;
use crate::snapshot::SnapshotStore;

/// The exporter service: the collector (and the daemon registry it owns)
/// plus the snapshot it publishes into.
///
/// Cloning shares both, which is how the scrape task and the HTTP front end
/// see the same state.
#[derive(Debug, Clone)]
pub struct Exporter {
    collector: Arc<Mutex<Collector>>,
    snapshot: SnapshotStore,
    period: Duration,
}

impl Exporter {
    pub fn new(config: ExporterConfig) -> Self {
        let period = config.stats_period();
        Self {
            collector: Arc::new(Mutex::new(Collector::new(config))),
            snapshot: SnapshotStore::new(),
            period,
        }
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one scrape cycle on a blocking thread and publish its output.
    ///
    /// A lock poisoned by an earlier panicked cycle is recovered.
    pub async fn cycle(&self) -> Result<CycleReport, DaemonError> {
        let collector = Arc::clone(&self.collector);
        let report = tokio::task::spawn_blocking(move || {
            collector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .collect()
        })
        .await
        .map_err(|err| DaemonError::Protocol(format!("scrape cycle join error: {err}")))?;
        self.snapshot.publish(report.text.clone()).await;
        Ok(report)
    }
}

/// Start the exporter runtime and block the current thread until it exits.
pub fn start_blocking(config: ExporterConfig, json_logs: bool) -> Result<(), DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Bind the HTTP listener, then scrape and serve until ctrl-c.
pub async fn run(config: ExporterConfig) -> Result<(), DaemonError> {
    let listener = http::bind(config.bind_addr()).await?;
    let exporter = Exporter::new(config);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down exporter");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let served = run_until(exporter, listener, shutdown_tx.clone()).await;
    let _ = shutdown_tx.send(());
    handle_join("signal_handler", signal_handle.await)?;
    served
}

/// Run the scrape task and the HTTP front end until `shutdown` fires or
/// either task fails.
pub async fn run_until(
    exporter: Exporter,
    listener: TcpListener,
    shutdown: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let scrape_handle = {
        let shutdown = shutdown.clone();
        let shutdown_rx = shutdown.subscribe();
        let exporter = exporter.clone();
        tokio::spawn(async move {
            let result = scrape_task(exporter, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let http_handle = {
        let shutdown = shutdown.clone();
        let shutdown_rx = shutdown.subscribe();
        let store = exporter.snapshot().clone();
        tokio::spawn(async move {
            let result = http::serve(listener, store, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let (scrape_result, http_result) = tokio::join!(scrape_handle, http_handle);
    handle_join("scrape", scrape_result)?;
    handle_join("http_server", http_result)?;
    Ok(())
}

/// One cycle immediately, then one cycle `period` after each completes.
/// A failed cycle keeps the previous snapshot.
async fn scrape_task(
    exporter: Exporter,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        match exporter.cycle().await {
            Ok(report) => tracing::debug!(
                daemons = report.daemons_total,
                succeeded = report.daemons_ok,
                metrics = report.metrics,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "snapshot published",
            ),
            Err(err) => tracing::warn!(error = %err, "scrape cycle failed"),
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(exporter.period()) => {}
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the global subscriber. Logs go to stderr so `scrape` output on
/// stdout stays clean.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ExporterConfig {
        ExporterConfig {
            sock_dir: dir.path().join("run"),
            proc_path: dir.path().join("proc"),
            addr: "127.0.0.1".parse().expect("addr"),
            port: 0,
            ..ExporterConfig::default()
        }
    }

    #[tokio::test]
    async fn cycle_publishes_scrape_time() {
        let dir = TempDir::new().expect("tempdir");
        let exporter = Exporter::new(config_in(&dir));
        assert_eq!(exporter.snapshot().read().await, "");

        let report = tokio_test::assert_ok!(exporter.cycle().await);
        assert_eq!(report.daemons_total, 0);
        let published = exporter.snapshot().read().await;
        assert_eq!(published, report.text);
        assert!(published.contains("# TYPE ceph_exporter_scrape_time gauge"));
    }

    #[tokio::test]
    async fn shutdown_stops_both_tasks() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_in(&dir);
        let listener = http::bind(config.bind_addr()).await.expect("bind");
        let (shutdown_tx, _) = broadcast::channel::<()>(4);

        let handle = tokio::spawn(run_until(Exporter::new(config), listener, shutdown_tx.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stopped in time")
            .expect("join");
        assert!(result.is_ok());
    }

    fn poison(exporter: &Exporter) {
        let collector = Arc::clone(&exporter.collector);
        let _ = std::thread::spawn(move || {
            let _guard = collector.lock().expect("lock");
            panic!("cycle panicked while holding the collector");
        })
        .join();
        assert!(exporter.collector.is_poisoned());
    }

    #[tokio::test]
    async fn poisoned_collector_still_cycles() {
        let dir = TempDir::new().expect("tempdir");
        let exporter = Exporter::new(config_in(&dir));
        poison(&exporter);

        let report = tokio_test::assert_ok!(exporter.cycle().await);
        assert_eq!(exporter.snapshot().read().await, report.text);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn poisoned_collector_keeps_http_serving() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let dir = TempDir::new().expect("tempdir");
        let config = ExporterConfig {
            stats_period_secs: 60,
            ..config_in(&dir)
        };
        let listener = http::bind(config.bind_addr()).await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let exporter = Exporter::new(config);
        poison(&exporter);
        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let handle = tokio::spawn(run_until(exporter, listener, shutdown_tx.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\n\r\n")
            .await
            .expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read");
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {response}");
        assert!(response.contains("ceph_exporter_scrape_time"));

        let _ = shutdown_tx.send(());
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stopped in time")
            .expect("join");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = taken.local_addr().expect("addr");
        let err = http::bind(addr).await.unwrap_err();
        assert!(matches!(err, DaemonError::Bind { .. }), "got: {err}");
    }
}
