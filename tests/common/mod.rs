//! Helpers shared by the integration tests: a server harness on an
//! OS-assigned port, a raw TCP client, a capturing log writer, and a
//! fixed-table authenticator.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plinth::auth::{AuthError, Authenticator, Claims, Role};
use plinth::{App, Error, Server, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// ── Server harness ────────────────────────────────────────────────────────────

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<Result<(), Error>>,
}

impl TestServer {
    /// Signals shutdown and waits for the drain, bounded so a wedged server
    /// fails the test instead of hanging it.
    pub async fn stop(self) -> Result<(), Error> {
        self.shutdown.signal();
        self.join().await
    }

    /// Waits for `serve` to return on its own.
    pub async fn join(self) -> Result<(), Error> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not drain in time")
            .expect("server task panicked")
    }
}

pub async fn start(build: impl FnOnce(Shutdown) -> App) -> TestServer {
    start_with_grace(Duration::from_secs(5), build).await
}

pub async fn start_with_grace(
    grace: Duration,
    build: impl FnOnce(Shutdown) -> App,
) -> TestServer {
    let shutdown = Shutdown::new();
    let app = build(shutdown.clone());

    let server = Server::bind("127.0.0.1:0")
        .await
        .expect("bind test server")
        .grace_period(grace);
    let addr = server.local_addr().expect("test server addr");
    let handle = tokio::spawn(server.serve(app));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

// ── Raw TCP client ────────────────────────────────────────────────────────────

/// Sends one request and reads the connection to EOF. Every request carries
/// `connection: close` so EOF marks the end of the response.
pub async fn send(addr: SocketAddr, raw: &str) -> io::Result<(u16, String)> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(raw.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;

    let text = String::from_utf8_lossy(&buf).into_owned();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| io::Error::other(format!("malformed response: {text:?}")))?;
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_owned())
        .unwrap_or_default();

    Ok((status, body))
}

pub async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    send(
        addr,
        &format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n"),
    )
    .await
    .expect("request failed")
}

pub async fn get_with_bearer(addr: SocketAddr, path: &str, token: &str) -> (u16, String) {
    send(
        addr,
        &format!(
            "GET {path} HTTP/1.1\r\nhost: localhost\r\nauthorization: Bearer {token}\r\nconnection: close\r\n\r\n"
        ),
    )
    .await
    .expect("request failed")
}

pub async fn post(addr: SocketAddr, path: &str, body: &str) -> (u16, String) {
    send(
        addr,
        &format!(
            "POST {path} HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len(),
        ),
    )
    .await
    .expect("request failed")
}

// ── Log capture ───────────────────────────────────────────────────────────────

/// An `io::Write` that appends to a shared buffer, so a test can assert on
/// what the service logged.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn occurrences(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs a capturing subscriber as this thread's default for the guard's
/// lifetime. Tests here run single-threaded, so everything the server logs
/// lands in the returned buffer.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

// ── Fixture authenticator ─────────────────────────────────────────────────────

/// Accepts `admin-token` and `user-token`, rejects anything else.
pub struct TableAuth;

impl Authenticator for TableAuth {
    fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        match token {
            "admin-token" => Ok(Claims {
                subject: "admin-1".into(),
                roles: vec![Role::Admin, Role::User],
            }),
            "user-token" => Ok(Claims {
                subject: "user-1".into(),
                roles: vec![Role::User],
            }),
            other => Err(AuthError::InvalidToken(other.to_owned())),
        }
    }
}
