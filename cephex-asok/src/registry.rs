//! Daemon discovery from the admin-socket directory.
//!
//! # Layout
//!
//! ```text
//! <sock_dir>/
//!   ceph-osd.0.asok        -> daemon "ceph-osd.0"
//!   ceph-mon.a.asok        -> daemon "ceph-mon.a"
//!   ceph-mgr.x.asok        -> excluded ("mgr")
//!   radosgw.gw1.asok       -> daemon "radosgw.gw1"
//!   ceph-osd.0.pid         -> ignored (not a socket)
//! ```
//!
//! The registry keeps no state between refreshes: every [`DaemonRegistry::refresh`]
//! drops all handles and rebuilds them from the directory listing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cephex_core::{DaemonName, ExporterConfig};

use crate::error::{io_err, AsokError};
use crate::transport::AdminSocketClient;

pub const ASOK_EXTENSION: &str = "asok";

/// A discovered daemon and the transport bound to its socket.
#[derive(Debug, Clone)]
pub struct DaemonHandle<S = AdminSocketClient> {
    pub name: DaemonName,
    pub path: PathBuf,
    pub socket: S,
}

/// Named handles for every daemon found in the socket directory.
#[derive(Debug)]
pub struct DaemonRegistry {
    sock_dir: PathBuf,
    exclude: Vec<String>,
    timeout: Duration,
    handles: BTreeMap<DaemonName, DaemonHandle>,
}

impl DaemonRegistry {
    pub fn new(sock_dir: impl Into<PathBuf>, exclude: Vec<String>, timeout: Duration) -> Self {
        Self {
            sock_dir: sock_dir.into(),
            exclude,
            timeout,
            handles: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(
            config.sock_dir.clone(),
            config.exclude.clone(),
            config.asok_timeout(),
        )
    }

    pub fn sock_dir(&self) -> &Path {
        &self.sock_dir
    }

    /// Drop every handle and re-enumerate the socket directory.
    ///
    /// A missing or unreadable directory is logged and leaves the registry
    /// empty; the cycle then scrapes zero daemons. Returns the handle count.
    pub fn refresh(&mut self) -> usize {
        self.handles.clear();
        let found = match discover(&self.sock_dir, &self.exclude) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    sock_dir = %self.sock_dir.display(),
                    error = %err,
                    "daemon discovery failed",
                );
                return 0;
            }
        };
        for (name, path) in found {
            let socket = AdminSocketClient::new(path.clone(), self.timeout);
            self.handles
                .entry(name.clone())
                .or_insert(DaemonHandle { name, path, socket });
        }
        tracing::debug!(count = self.handles.len(), "daemon registry refreshed");
        self.handles.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = &DaemonHandle> {
        self.handles.values()
    }

    pub fn names(&self) -> Vec<DaemonName> {
        self.handles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// List `(daemon name, socket path)` for every non-excluded `*.asok` entry,
/// sorted by name.
pub fn discover(
    sock_dir: &Path,
    exclude: &[String],
) -> Result<Vec<(DaemonName, PathBuf)>, AsokError> {
    if !sock_dir.is_dir() {
        return Err(AsokError::SockDir {
            path: sock_dir.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(sock_dir).map_err(|e| io_err(sock_dir, e))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable socket dir entry");
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = daemon_name_for(&path) else {
            continue;
        };
        if is_excluded(&name, exclude) {
            tracing::trace!(daemon = %name, "excluded from scraping");
            continue;
        }
        found.push((name, path));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

/// `osd.0.asok` -> `osd.0`; `None` for anything without the socket extension.
pub fn daemon_name_for(path: &Path) -> Option<DaemonName> {
    let is_socket = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == ASOK_EXTENSION)
        .unwrap_or(false);
    if !is_socket {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(DaemonName::from)
}

pub fn is_excluded(name: &DaemonName, exclude: &[String]) -> bool {
    exclude
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| name.as_str().contains(pattern.as_str()))
}
