//! Admin-socket access for the exporter.
//!
//! - [`transport`]: the [`AdminSocket`] trait and its Unix-socket client
//! - [`protocol`]: the scrape commands and their failure rules
//! - [`registry`]: discovery of daemons in the socket directory

mod error;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use error::AsokError;
pub use protocol::{asok_command, pid_file_path, COUNTER_DUMP, COUNTER_SCHEMA, CONFIG_SHOW};
pub use registry::{DaemonHandle, DaemonRegistry};
pub use transport::{AdminSocket, AdminSocketClient};
