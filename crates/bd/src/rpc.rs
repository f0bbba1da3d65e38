//! Client side of the daemon RPC socket.
//!
//! Short-lived CLI processes send one newline-delimited JSON envelope per
//! request over `.beads/bd.sock` and read one response line back.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Returns `true` if a daemon appears to be listening for this workspace.
pub fn daemon_available(socket_path: &Path) -> bool {
    socket_path.exists() && UnixStream::connect(socket_path).is_ok()
}

/// Sends one request to a running daemon and returns its `data` payload.
///
/// `read_timeout` bounds the wait (blocking operations like `decisionWait`
/// pass a budget slightly above their own timeout).
pub fn call(
    socket_path: &Path,
    operation: &str,
    args: Value,
    read_timeout: Duration,
) -> Result<Value> {
    let mut stream = UnixStream::connect(socket_path)
        .with_context(|| format!("connecting to daemon at {}", socket_path.display()))?;
    stream.set_read_timeout(Some(read_timeout))?;

    let request = serde_json::json!({"operation": operation, "args": args});
    let mut line = serde_json::to_vec(&request)?;
    line.push(b'\n');
    stream.write_all(&line)?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    reader.read_line(&mut response)?;
    if response.trim().is_empty() {
        bail!("daemon closed the connection without responding");
    }

    let envelope: Value = serde_json::from_str(response.trim())
        .context("daemon sent a malformed response")?;
    if envelope["success"].as_bool() == Some(true) {
        Ok(envelope["data"].clone())
    } else {
        bail!(
            "{}",
            envelope["error"].as_str().unwrap_or("daemon reported failure")
        )
    }
}
