//! Admin-socket transport.
//!
//! # Wire format
//!
//! ```text
//! client -> daemon   <request bytes> 0x00
//! daemon -> client   <u32 big-endian length> <payload bytes>
//! ```
//!
//! One request per connection; the daemon closes after replying.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;

use crate::error::{io_err, AsokError};

/// Upper bound on a single reply; a counter dump of a busy OSD is a few MiB.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// The request a daemon answers with its one-byte protocol version.
const PING_REQUEST: &str = r#"{"prefix": "0"}"#;

/// Request/response access to one daemon's control socket.
pub trait AdminSocket {
    /// `true` if the daemon answers the version probe.
    fn ping(&self) -> bool;

    /// Send `{"prefix": "<command>"}` and return the raw reply.
    fn request(&self, command: &str) -> Result<String, AsokError>;
}

/// Blocking admin-socket client bound to a socket path.
#[derive(Debug, Clone)]
pub struct AdminSocketClient {
    path: PathBuf,
    timeout: Duration,
}

impl AdminSocketClient {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Send one raw request and read the length-prefixed reply.
    pub fn exchange(&self, request: &str) -> Result<String, AsokError> {
        let path = &self.path;
        let mut stream = UnixStream::connect(path).map_err(|e| io_err(path, e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| io_err(path, e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| io_err(path, e))?;

        stream
            .write_all(request.as_bytes())
            .map_err(|e| io_err(path, e))?;
        stream.write_all(&[0]).map_err(|e| io_err(path, e))?;
        stream.flush().map_err(|e| io_err(path, e))?;

        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .map_err(|e| io_err(path, e))?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_RESPONSE_BYTES {
            return Err(AsokError::Protocol(format!(
                "reply of {len} bytes from {} exceeds limit",
                path.display()
            )));
        }

        let mut payload = vec![0u8; len];
        stream
            .read_exact(&mut payload)
            .map_err(|e| io_err(path, e))?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }
}

impl AdminSocket for AdminSocketClient {
    fn ping(&self) -> bool {
        match self.exchange(PING_REQUEST) {
            Ok(version) => version.len() == 1,
            Err(err) => {
                tracing::debug!(socket = %self.path.display(), error = %err, "ping failed");
                false
            }
        }
    }

    fn request(&self, command: &str) -> Result<String, AsokError> {
        let request = json!({ "prefix": command }).to_string();
        self.exchange(&request)
    }
}
