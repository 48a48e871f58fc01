//! The HTTP front end over a real TCP socket, with the scrape task running.

use std::net::SocketAddr;
use std::time::Duration;

use cephex_core::ExporterConfig;
use cephex_daemon::{http, run_until, Exporter, SnapshotStore};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

struct Running {
    addr: SocketAddr,
    store: SnapshotStore,
    shutdown: broadcast::Sender<()>,
    _dir: TempDir,
}

async fn start() -> Running {
    let dir = TempDir::new().expect("tempdir");
    let config = ExporterConfig {
        sock_dir: dir.path().join("run"),
        proc_path: dir.path().join("proc"),
        addr: "127.0.0.1".parse().expect("addr"),
        port: 0,
        stats_period_secs: 60,
        ..ExporterConfig::default()
    };
    let listener = http::bind(config.bind_addr()).await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let exporter = Exporter::new(config);
    let store = exporter.snapshot().clone();
    let (shutdown, _) = broadcast::channel::<()>(4);
    tokio::spawn(run_until(exporter, listener, shutdown.clone()));

    for _ in 0..100 {
        if !store.read().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Running {
        addr,
        store,
        shutdown,
        _dir: dir,
    }
}

async fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(raw.as_bytes()).await.expect("write");
    let mut out = String::new();
    stream.read_to_string(&mut out).await.expect("read");
    out
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metrics_serves_published_snapshot() {
    let running = start().await;
    let response = send(running.addr, "GET /metrics HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {response}");
    assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert_eq!(body(&response), running.store.read().await);
    assert!(body(&response).contains("ceph_exporter_scrape_time"));
    let _ = running.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_path_is_405_file_not_found() {
    let running = start().await;
    let response = send(running.addr, "GET /bogus HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 405 "), "got: {response}");
    assert_eq!(body(&response), "File not found \n");
    let _ = running.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_get_is_rejected_with_method_name() {
    let running = start().await;
    let response = send(running.addr, "DELETE /metrics HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 405 "));
    assert_eq!(body(&response), "Invalid request-method 'DELETE'");
    let _ = running.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn landing_page_links_metrics() {
    let running = start().await;
    let response = send(running.addr, "GET / HTTP/1.0\r\n\r\n").await;
    assert!(response.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(body(&response).contains("<a href='/metrics'>Metrics</a>"));
    let _ = running.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_headers_are_dropped_without_response() {
    let running = start().await;
    let mut stream = TcpStream::connect(running.addr).await.expect("connect");
    let huge = format!("GET /metrics HTTP/1.1\r\nX-Pad: {}\r\n", "a".repeat(9000));
    let _ = stream.write_all(huge.as_bytes()).await;
    let mut out = Vec::new();
    let _ = stream.read_to_end(&mut out).await;
    assert!(out.is_empty());

    // The server keeps accepting afterwards.
    let response = send(running.addr, "GET /bogus HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 405 "));
    let _ = running.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_get_complete_bodies() {
    let running = start().await;
    let expected = running.store.read().await;
    let mut clients = Vec::new();
    for _ in 0..16 {
        let addr = running.addr;
        clients.push(tokio::spawn(async move {
            send(addr, "GET /metrics HTTP/1.1\r\n\r\n").await
        }));
    }
    for client in clients {
        let response = client.await.expect("client");
        let text = body(&response);
        let length: usize = response
            .lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .and_then(|v| v.trim().parse().ok())
            .expect("content length");
        assert_eq!(text.len(), length);
        assert!(text.contains("ceph_exporter_scrape_time"));
    }
    assert!(!expected.is_empty());
    let _ = running.shutdown.send(());
}

#[tokio::test(start_paused = true)]
async fn idle_connection_is_closed_at_deadline() {
    let listener = http::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown, shutdown_rx) = broadcast::channel::<()>(1);
    let server = tokio::spawn(http::serve(listener, SnapshotStore::new(), shutdown_rx));

    let started = tokio::time::Instant::now();
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let mut out = Vec::new();
    let read = tokio::time::timeout(
        http::CONNECTION_DEADLINE * 2,
        stream.read_to_end(&mut out),
    )
    .await;

    assert!(matches!(read, Ok(Ok(0))), "got: {read:?}");
    assert!(out.is_empty());
    assert!(started.elapsed() >= http::CONNECTION_DEADLINE);

    let _ = shutdown.send(());
    let _ = server.await;
}
