//! Socket servers: per-workspace Unix socket, optional authenticated TCP.
//!
//! Connections are persistent: one newline-delimited JSON request per line,
//! one response line back, many requests per connection. Idle connections
//! time out; a partial line waits for its newline until the same timeout.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};
use tracing::{debug, info, warn};

use crate::handlers::Handler;
use crate::protocol::{Request, Response};

/// Default idle window after which a silent connection is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Listener configuration for one daemon instance.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Path of the per-workspace Unix socket (`.beads/bd.sock`).
    pub socket_path: PathBuf,
    /// Optional TCP address (loopback recommended). Requires `token`.
    pub tcp_addr: Option<String>,
    /// Shared secret demanded of every TCP request (`BEADS_DAEMON_TOKEN`).
    pub token: Option<String>,
    pub idle_timeout: Duration,
}

impl DaemonOptions {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            tcp_addr: None,
            token: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Binds the listeners and serves until `shutdown` resolves.
///
/// Startup is loud: an unparseable or occupied TCP address, or TCP without a
/// token, fails immediately rather than degrading.
pub async fn run_daemon<S>(
    handler: Handler,
    options: DaemonOptions,
    shutdown: S,
) -> std::io::Result<()>
where
    S: std::future::Future<Output = ()>,
{
    // A leftover socket file from a dead daemon would fail the bind.
    if options.socket_path.exists() {
        std::fs::remove_file(&options.socket_path)?;
    }
    let unix = UnixListener::bind(&options.socket_path)?;
    restrict_socket_mode(&options.socket_path)?;
    info!(socket = %options.socket_path.display(), "daemon listening on unix socket");

    let tcp = match options.tcp_addr {
        Some(ref addr) => {
            if options.token.is_none() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "TCP listener requires BEADS_DAEMON_TOKEN",
                ));
            }
            let listener = TcpListener::bind(addr).await?;
            info!(addr, "daemon listening on tcp");
            Some(listener)
        }
        None => None,
    };

    let idle = options.idle_timeout;
    let token = options.token.clone();

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = unix.accept() => {
                let (stream, _) = accepted?;
                let handler = handler.clone();
                tokio::spawn(async move {
                    // Unix socket access is already gated by file mode 0600.
                    if let Err(e) = serve_connection(stream, handler, idle, None).await {
                        debug!(error = %e, "unix connection ended with error");
                    }
                });
            }
            accepted = accept_tcp(tcp.as_ref()) => {
                let stream = accepted?;
                let handler = handler.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, handler, idle, token).await {
                        debug!(error = %e, "tcp connection ended with error");
                    }
                });
            }
            () = &mut shutdown => {
                info!("daemon shutting down");
                break;
            }
        }
    }

    std::fs::remove_file(&options.socket_path).ok();
    Ok(())
}

/// Accept helper that parks forever when TCP is disabled.
async fn accept_tcp(
    listener: Option<&TcpListener>,
) -> std::io::Result<tokio::net::TcpStream> {
    match listener {
        Some(listener) => listener.accept().await.map(|(stream, _)| stream),
        None => std::future::pending().await,
    }
}

/// The Unix socket is private to the owning user.
fn restrict_socket_mode(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

/// Serves one persistent connection.
///
/// `required_token` is demanded of every request envelope when set (the TCP
/// path); requests without it are refused but the connection stays usable.
pub async fn serve_connection<S>(
    stream: S,
    handler: Handler,
    idle_timeout: Duration,
    required_token: Option<String>,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match tokio::time::timeout(idle_timeout, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Ok(()), // clean EOF
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!("idle timeout; closing connection");
                return Ok(());
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                if let Some(ref token) = required_token {
                    let presented = request
                        .args
                        .get("token")
                        .and_then(serde_json::Value::as_str);
                    if presented != Some(token.as_str()) {
                        warn!(operation = %request.operation, "rejecting unauthenticated tcp request");
                        respond(&mut write_half, &Response::err("invalid or missing token"))
                            .await?;
                        continue;
                    }
                }
                match handler.dispatch(&request.operation, &request.args).await {
                    Ok(data) => Response::ok(data),
                    Err(error) => Response::err(error),
                }
            }
            Err(e) => Response::err(format!("malformed request: {e}")),
        };
        respond(&mut write_half, &response).await?;
    }
}

async fn respond<W: AsyncWrite + Unpin>(
    write_half: &mut W,
    response: &Response,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    write_half.write_all(&line).await?;
    write_half.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use beads_storage::{SqliteStore, Storage};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixStream;

    fn test_handler() -> Handler {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.set_config("issue_prefix", "bd").unwrap();
        Handler::new(store, EventBus::new(), None)
    }

    async fn request_line(stream: &mut UnixStream, line: &str) -> serde_json::Value {
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.write_all(b"\n").await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        reader.read_line(&mut response).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn unix_socket_health_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");
        let handler = test_handler();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(run_daemon(
            handler,
            DaemonOptions::new(socket.clone()),
            async move {
                stop_rx.await.ok();
            },
        ));

        // Wait for the socket to appear.
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        let response = request_line(&mut stream, r#"{"operation":"health"}"#).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["status"], "ok");

        // Persistent connection: a second request on the same stream works.
        let response =
            request_line(&mut stream, r#"{"operation":"types","args":{}}"#).await;
        assert_eq!(response["success"], true);

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!socket.exists(), "socket removed on shutdown");
    }

    #[tokio::test]
    async fn requests_on_one_connection_apply_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");
        let handler = test_handler();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(run_daemon(
            handler,
            DaemonOptions::new(socket.clone()),
            async move {
                stop_rx.await.ok();
            },
        ));
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        let created = request_line(
            &mut stream,
            r#"{"operation":"create","args":{"title":"Ordered","actor":"t"}}"#,
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_owned();

        let updated = request_line(
            &mut stream,
            &format!(r#"{{"operation":"update","args":{{"id":"{id}","priority":0}}}}"#),
        )
        .await;
        assert_eq!(updated["success"], true);

        let shown = request_line(
            &mut stream,
            &format!(r#"{{"operation":"show","args":{{"id":"{id}"}}}}"#),
        )
        .await;
        assert_eq!(shown["data"]["priority"], 0);

        stop_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn malformed_and_unknown_requests_fail_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(run_daemon(
            test_handler(),
            DaemonOptions::new(socket.clone()),
            async move {
                stop_rx.await.ok();
            },
        ));
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut stream = UnixStream::connect(&socket).await.unwrap();
        let response = request_line(&mut stream, "this is not json").await;
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("malformed"));

        let response = request_line(&mut stream, r#"{"operation":"frobnicate"}"#).await;
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("unknown operation"));

        stop_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn tcp_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");
        let mut options = DaemonOptions::new(socket.clone());
        options.tcp_addr = Some("127.0.0.1:0".into());

        // No token configured: startup fails loudly.
        let err = run_daemon(test_handler(), options.clone(), async {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("BEADS_DAEMON_TOKEN"));
    }

    #[tokio::test]
    async fn tcp_rejects_bad_token_and_accepts_good() {
        use tokio::net::TcpStream;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");

        // Bind our own listener port first so the test knows the address.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let mut options = DaemonOptions::new(socket.clone());
        options.tcp_addr = Some(addr.to_string());
        options.token = Some("sekrit".into());

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(run_daemon(test_handler(), options, async move {
            stop_rx.await.ok();
        }));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"{\"operation\":\"health\",\"args\":{}}\n")
            .await
            .unwrap();
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("token"));

        stream
            .write_all(b"{\"operation\":\"health\",\"args\":{\"token\":\"sekrit\"}}\n")
            .await
            .unwrap();
        let n = stream.read(&mut buf).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(response["success"], true);

        stop_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("bd.sock");
        let mut options = DaemonOptions::new(socket.clone());
        options.idle_timeout = Duration::from_millis(100);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(run_daemon(test_handler(), options, async move {
            stop_rx.await.ok();
        }));
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stream = UnixStream::connect(&socket).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // The server has dropped its side; a read sees EOF.
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        assert_eq!(n, 0);

        stop_tx.send(()).unwrap();
    }
}
