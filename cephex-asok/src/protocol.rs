//! Scrape commands issued to every daemon each cycle.

use std::path::PathBuf;

use serde_json::Value;

use cephex_core::DaemonName;

use crate::error::AsokError;
use crate::transport::AdminSocket;

pub const COUNTER_DUMP: &str = "counter dump";
pub const COUNTER_SCHEMA: &str = "counter schema";
pub const CONFIG_SHOW: &str = "config show";

/// Marker a daemon puts at the start of a reply it could not serve.
const ERROR_TOKEN: &str = "ERROR";

/// Run `command` against `socket` and parse the reply as JSON.
///
/// Transport errors, replies starting with `ERROR`, and empty replies are all
/// failures; each is logged against `daemon` before being returned.
pub fn asok_command<S: AdminSocket + ?Sized>(
    socket: &S,
    daemon: &DaemonName,
    command: &str,
) -> Result<Value, AsokError> {
    let result = socket.request(command).and_then(|raw| parse_reply(command, &raw));
    if let Err(err) = &result {
        tracing::warn!(daemon = %daemon, command, error = %err, "admin socket command failed");
    }
    result
}

fn parse_reply(command: &str, raw: &str) -> Result<Value, AsokError> {
    if raw.starts_with(ERROR_TOKEN) {
        return Err(AsokError::DaemonReported {
            command: command.to_string(),
            message: raw.trim().to_string(),
        });
    }
    if raw.trim().is_empty() {
        return Err(AsokError::EmptyResponse {
            command: command.to_string(),
        });
    }
    serde_json::from_str(raw).map_err(|source| AsokError::Json {
        command: command.to_string(),
        source,
    })
}

/// The daemon's configured `pid_file`, if `config show` names a non-empty one.
pub fn pid_file_path(config_show: &Value) -> Option<PathBuf> {
    config_show
        .get("pid_file")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    struct Canned(RefCell<Vec<Result<String, AsokError>>>);

    impl AdminSocket for Canned {
        fn ping(&self) -> bool {
            true
        }

        fn request(&self, _command: &str) -> Result<String, AsokError> {
            self.0.borrow_mut().remove(0)
        }
    }

    fn canned(reply: Result<&str, AsokError>) -> Canned {
        Canned(RefCell::new(vec![reply.map(str::to_string)]))
    }

    #[test]
    fn json_reply_is_parsed() {
        let socket = canned(Ok(r#"{"osd":[]}"#));
        let value = asok_command(&socket, &DaemonName::from("osd.0"), COUNTER_DUMP).expect("ok");
        assert_eq!(value, json!({"osd": []}));
    }

    #[test]
    fn error_token_is_failure() {
        let socket = canned(Ok("ERROR: unknown command"));
        let err = asok_command(&socket, &DaemonName::from("osd.0"), COUNTER_DUMP).unwrap_err();
        assert!(matches!(err, AsokError::DaemonReported { .. }), "got: {err}");
    }

    #[test]
    fn empty_reply_is_failure() {
        let socket = canned(Ok(""));
        let err = asok_command(&socket, &DaemonName::from("osd.0"), COUNTER_SCHEMA).unwrap_err();
        assert!(matches!(err, AsokError::EmptyResponse { .. }), "got: {err}");
    }

    #[test]
    fn transport_error_passes_through() {
        let socket = canned(Err(AsokError::Protocol("reset".to_string())));
        let err = asok_command(&socket, &DaemonName::from("osd.0"), CONFIG_SHOW).unwrap_err();
        assert!(matches!(err, AsokError::Protocol(_)));
    }

    #[test]
    fn garbage_reply_is_json_error() {
        let socket = canned(Ok("not json"));
        let err = asok_command(&socket, &DaemonName::from("osd.0"), COUNTER_DUMP).unwrap_err();
        assert!(matches!(err, AsokError::Json { .. }));
    }

    #[test]
    fn pid_file_lookup() {
        assert_eq!(
            pid_file_path(&json!({"pid_file": "/var/run/ceph/osd.0.pid"})),
            Some(PathBuf::from("/var/run/ceph/osd.0.pid"))
        );
        assert_eq!(pid_file_path(&json!({"pid_file": ""})), None);
        assert_eq!(pid_file_path(&json!({"name": "osd.0"})), None);
        assert_eq!(pid_file_path(&json!({"pid_file": 12})), None);
    }
}
