//! Built-in Kubernetes health-check handlers.
//!
//! Kubernetes asks two questions. plinth answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your app:
//!
//! ```rust,no_run
//! use plinth::{App, Method, Shutdown, health};
//!
//! let app = App::new(Shutdown::new(), [])
//!     .on(Method::GET, "/healthz", health::liveness)
//!     .on(Method::GET, "/readyz", health::readiness);
//! ```
//!
//! Override `readiness` with a custom handler if you need to gate on
//! dependency availability (database connections, downstream services, etc.):
//!
//! ```rust,no_run
//! use plinth::{Ctx, Error, Request, Responder, StatusCode};
//!
//! async fn readiness(ctx: Ctx, res: Responder, _req: Request) -> Result<(), Error> {
//!     if dependencies_are_healthy().await {
//!         res.respond(&ctx, &serde_json::json!({"status": "ready"}), StatusCode::OK)
//!     } else {
//!         Err(Error::trusted(StatusCode::SERVICE_UNAVAILABLE, "not ready"))
//!     }
//! }
//!
//! async fn dependencies_are_healthy() -> bool { true }
//! ```

use http::StatusCode;
use serde::Serialize;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::request::Request;
use crate::responder::Responder;

#[derive(Serialize)]
struct Probe {
    status: &'static str,
}

/// Kubernetes liveness probe handler.
///
/// Always returns `200 OK` with body `{"status":"ok"}`. If the process can
/// respond to HTTP at all, it is alive — this handler intentionally has no
/// dependencies.
pub async fn liveness(ctx: Ctx, res: Responder, _req: Request) -> Result<(), Error> {
    res.respond(&ctx, &Probe { status: "ok" }, StatusCode::OK)
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Returns `200 OK` with body `{"status":"ready"}`. Replace it with your own
/// handler if your application needs a warm-up period or must verify
/// dependency health before accepting traffic.
pub async fn readiness(ctx: Ctx, res: Responder, _req: Request) -> Result<(), Error> {
    res.respond(&ctx, &Probe { status: "ready" }, StatusCode::OK)
}
