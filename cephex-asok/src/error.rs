use std::path::PathBuf;

use thiserror::Error;

/// Error surface for admin-socket transport, protocol, and discovery.
#[derive(Debug, Error)]
pub enum AsokError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("admin socket timed out: {path}")]
    Timeout { path: PathBuf },

    #[error("admin socket protocol error: {0}")]
    Protocol(String),

    #[error("command '{command}' failed: {message}")]
    DaemonReported { command: String, message: String },

    #[error("command '{command}' returned an empty response")]
    EmptyResponse { command: String },

    #[error("command '{command}' returned invalid JSON: {source}")]
    Json {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("socket directory is not a directory: {path}")]
    SockDir { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> AsokError {
    let path = path.into();
    match source.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
            AsokError::Timeout { path }
        }
        _ => AsokError::Io { path, source },
    }
}
