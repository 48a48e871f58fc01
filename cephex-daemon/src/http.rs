//! Minimal HTTP/1.x front end serving the snapshot.
//!
//! | request          | status | body                               |
//! |------------------|--------|------------------------------------|
//! | `GET /`          | 200    | landing page linking `/metrics`    |
//! | `GET /metrics`   | 200    | current snapshot                   |
//! | `GET <other>`    | 405    | `File not found \n`                |
//! | `<METHOD> *`     | 405    | `Invalid request-method '<METHOD>'`|
//!
//! Every connection gets one response and is closed.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::error::DaemonError;
use crate::snapshot::SnapshotStore;

/// Upper bound on the request line plus headers.
pub const MAX_REQUEST_BYTES: usize = 8192;

/// Deadline for the whole exchange on one connection.
pub const CONNECTION_DEADLINE: Duration = Duration::from_secs(60);

const HEADER_END: &[u8] = b"\r\n\r\n";
const SERVER_NAME: &str = "ceph-exporter";

const LANDING_PAGE: &str = "<html>\n\
<head><title>Ceph Exporter</title></head>\n\
<body>\n\
<h1>Ceph Exporter</h1>\n\
<p><a href='/metrics'>Metrics</a></p>\n\
</body>\n\
</html>\n";

const NOT_FOUND_BODY: &str = "File not found \n";

/// Method and path of a request; headers and body are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    /// Parse the request line of `head`. Missing tokens become empty strings
    /// and are routed like any other unknown method or path.
    pub fn parse(head: &[u8]) -> Self {
        let text = String::from_utf8_lossy(head);
        let line = text.lines().next().unwrap_or_default();
        let mut parts = line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default();
        let path = target.split('?').next().unwrap_or_default().to_string();
        Self { method, path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn not_allowed(body: String) -> Self {
        Self {
            status: 405,
            content_type: "text/plain",
            body,
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            405 => "Method Not Allowed",
            _ => "Unknown",
        }
    }

    /// Status line, headers, and body as sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nServer: {SERVER_NAME}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// Dispatch on method and path; only `/metrics` touches the store.
pub async fn route(request: &Request, store: &SnapshotStore) -> Response {
    if request.method != "GET" {
        return Response::not_allowed(format!("Invalid request-method '{}'", request.method));
    }
    match request.path.as_str() {
        "/" => Response::ok("text/html; charset=utf-8", LANDING_PAGE.to_string()),
        "/metrics" => Response::ok("text/plain; charset=utf-8", store.read().await),
        _ => Response::not_allowed(NOT_FOUND_BODY.to_string()),
    }
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, DaemonError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DaemonError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(addr = %local, "HTTP server listening");
    Ok(listener)
}

/// Accept connections until shutdown, one task per connection.
pub async fn serve(
    listener: TcpListener,
    store: SnapshotStore,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        continue;
                    }
                };
                let store = store.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer, store).await;
                });
            }
        }
    }
    Ok(())
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, store: SnapshotStore) {
    match tokio::time::timeout(CONNECTION_DEADLINE, exchange(stream, &store)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(peer = %peer, error = %err, "HTTP connection abandoned"),
        Err(_) => tracing::debug!(peer = %peer, "HTTP connection deadline expired"),
    }
}

async fn exchange(mut stream: TcpStream, store: &SnapshotStore) -> Result<(), DaemonError> {
    let head = read_head(&mut stream).await?;
    let request = Request::parse(&head);
    let response = route(&request, store).await;
    tracing::trace!(method = %request.method, path = %request.path, status = response.status, "HTTP request");
    stream
        .write_all(&response.to_bytes())
        .await
        .map_err(DaemonError::Connection)?;
    stream.shutdown().await.map_err(DaemonError::Connection)?;
    Ok(())
}

/// Read until the end of the headers, within [`MAX_REQUEST_BYTES`].
async fn read_head(stream: &mut TcpStream) -> Result<Vec<u8>, DaemonError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.map_err(DaemonError::Connection)?;
        if n == 0 {
            return Err(DaemonError::Request(
                "peer closed before end of headers".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            buf.truncate(end);
            return Ok(buf);
        }
        if buf.len() >= MAX_REQUEST_BYTES {
            return Err(DaemonError::Request(format!(
                "headers exceed {MAX_REQUEST_BYTES} bytes"
            )));
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_END.len())
        .position(|window| window == HEADER_END)
        .filter(|pos| pos + HEADER_END.len() <= MAX_REQUEST_BYTES)
}
