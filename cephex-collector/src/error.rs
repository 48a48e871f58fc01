//! Error types for cephex-collector.

use std::path::PathBuf;

use thiserror::Error;

use cephex_asok::AsokError;
use cephex_core::DaemonName;

/// All errors that can arise while scraping one daemon or sampling its process.
#[derive(Debug, Error)]
pub enum CollectError {
    /// An admin-socket command failed.
    #[error("admin socket error: {0}")]
    Asok(#[from] AsokError),

    /// The daemon did not answer the liveness probe.
    #[error("daemon {daemon} did not answer ping")]
    Unreachable { daemon: DaemonName },

    /// A reply parsed as JSON but not into the expected structure.
    #[error("unexpected '{command}' reply from {daemon}: {source}")]
    Shape {
        daemon: DaemonName,
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An accounting or pid file did not have the expected format.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Why the text of a `/proc` or pid file could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Convenience constructor for [`CollectError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CollectError {
    CollectError::Io {
        path: path.into(),
        source,
    }
}
