//! A fake admin-socket daemon speaking the real framing over a Unix socket.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;

use serde_json::Value;

pub struct FakeDaemon {
    pub path: PathBuf,
}

impl FakeDaemon {
    /// Bind `path` and answer each request with the reply registered for its prefix.
    ///
    /// The version probe (`"0"`) always answers `"2"`; unknown prefixes answer `ERROR ...`.
    pub fn spawn(path: &Path, replies: &[(&str, &str)]) -> Self {
        let replies: HashMap<String, String> = replies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let listener = UnixListener::bind(path).expect("bind fake daemon");
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                serve_one(&mut stream, &replies);
            }
        });
        Self {
            path: path.to_path_buf(),
        }
    }
}

fn serve_one(stream: &mut UnixStream, replies: &HashMap<String, String>) {
    let mut request = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) | Err(_) => return,
            Ok(_) if byte[0] == 0 => break,
            Ok(_) => request.push(byte[0]),
        }
    }
    let parsed: Value = serde_json::from_slice(&request).unwrap_or(Value::Null);
    let prefix = parsed["prefix"].as_str().unwrap_or_default().to_string();
    let reply = if prefix == "0" {
        "2".to_string()
    } else {
        replies
            .get(&prefix)
            .cloned()
            .unwrap_or_else(|| format!("ERROR: unrecognized command {prefix}"))
    };
    let _ = stream.write_all(&(reply.len() as u32).to_be_bytes());
    let _ = stream.write_all(reply.as_bytes());
}
