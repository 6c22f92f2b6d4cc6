//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Asking every in-flight connection to finish its current requests.
//! 3. Waiting up to [`grace_period`](Server::grace_period) for them, then
//!    returning from [`Server::serve`] so `main` can exit cleanly.
//!
//! The same drain runs when a handler reports an integrity problem through
//! the shutdown sentinel, or when any holder of the app's [`Shutdown`]
//! handle signals it. Keep `terminationGracePeriodSeconds` longer than the
//! configured grace period.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::App;
use crate::shutdown::Shutdown;

const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    grace: Duration,
}

impl Server {
    /// Binds to `addr` immediately, so a port conflict surfaces here rather
    /// than mid-[`serve`](Server::serve). Bind to port 0 to let the OS pick
    /// and read the result back with [`local_addr`](Server::local_addr).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), plinth::Error> {
    /// use plinth::Server;
    /// let server = Server::bind("0.0.0.0:3000").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            grace: DEFAULT_GRACE,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// How long [`serve`](Server::serve) waits for in-flight connections
    /// once draining starts. Connections still running at the end of the
    /// grace period are left behind, not aborted. Defaults to 30 s.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Accepts connections and dispatches their requests through `app`.
    ///
    /// Returns after a full drain, triggered by SIGTERM, Ctrl-C, or the
    /// app's [`Shutdown`] handle.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let Self { listener, grace } = self;
        let addr = listener.local_addr()?;

        // Shared across connection tasks; the routing table never changes
        // after this point.
        let app = Arc::new(app);
        let shutdown = app.shutdown().clone();

        // First OS signal flips the same token handlers and operators use.
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.signal();
            });
        }

        info!(%addr, "plinth listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them during the drain.
        let mut tasks = tokio::task::JoinSet::new();

        loop {
            tokio::select! {
                // `biased` makes select! check arms top-to-bottom instead of
                // randomly. Shutdown is checked first so the drain starts
                // even if the accept queue is never empty.
                biased;

                () = shutdown.signaled() => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(pair) => pair,
                        Err(err) => {
                            error!(?err, "accept");
                            continue;
                        }
                    };
                    tasks.spawn(serve_connection(
                        stream,
                        remote_addr,
                        Arc::clone(&app),
                        shutdown.clone(),
                    ));
                }

                // Reap finished connection tasks so the JoinSet does not
                // grow without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Close the accept socket before draining; clients get connection
        // refused instead of a hung handshake.
        drop(listener);

        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(abandoned = tasks.len(), "grace period expired, leaving connections behind");
            tasks.detach_all();
        }

        info!("plinth stopped");
        Ok(())
    }
}

// ── Connection handling ───────────────────────────────────────────────────────

/// Serves one connection until it closes or the drain begins.
async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    app: Arc<App>,
    shutdown: Shutdown,
) {
    // TokioIo adapts tokio's AsyncRead/AsyncWrite to the hyper IO traits.
    let io = TokioIo::new(stream);

    // `service_fn` turns a plain async function into a hyper `Service`. The
    // closure runs once per request on the connection, not once per
    // connection.
    let svc = service_fn(move |req| {
        let app = Arc::clone(&app);
        async move {
            let response = handle(app, req).await;
            Ok::<_, std::convert::Infallible>(response.into_http())
        }
    });

    // `auto::Builder` transparently handles both HTTP/1.1 and HTTP/2,
    // whatever the client negotiates.
    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(io, svc);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(err) = result {
                error!(peer = %remote_addr, ?err, "connection error");
            }
        }
        () = shutdown.signaled() => {
            // Stop taking new requests on this connection, finish the ones
            // already in flight, then close it.
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.await {
                error!(peer = %remote_addr, ?err, "connection error during drain");
            }
        }
    }
}

/// Core hot path: buffers one request and runs it through the app.
///
/// The error type is [`Infallible`](std::convert::Infallible) upstream — all
/// failures are handled here or inside [`App::dispatch`], so hyper never
/// sees an error.
async fn handle(app: Arc<App>, req: hyper::Request<hyper::body::Incoming>) -> Response {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(?err, "reading request body");
            return Response::empty(StatusCode::BAD_REQUEST);
        }
    };

    app.dispatch(Request::new(parts.method, parts.uri, parts.headers, body))
        .await
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` is a future that never resolves; on non-Unix platforms
    // the SIGTERM arm is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
