//! # plinth
//!
//! The foundation layer for Rust HTTP services behind a reverse proxy:
//! handler dispatch, middleware composition, an error taxonomy, and
//! graceful shutdown. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients, and body-size limits.
//! plinth does not. The proxy does proxy things. The foundation does
//! foundation things. Every feature plinth skips is one nginx already
//! ships, tested at scale, at no cost to you.
//!
//! What nginx / ingress already owns — plinth intentionally ignores:
//!
//! - **Body-size limits** — `client_max_body_size` in nginx
//! - **Rate limiting** — `limit_req` / ingress-nginx annotations
//! - **Slow-client protection** — nginx timeout and buffer settings
//! - **TLS termination** — nginx SSL / k8s ingress
//!
//! What's left for plinth — the part that is the same in every service and
//! wrong to rewrite per team:
//!
//! - One handler contract — `async fn(Ctx, Responder, Request) -> Result<(), Error>`
//! - Middleware as composition — logging, error translation, panic
//!   recovery, and credential checks wrap handlers once, at registration
//! - An error taxonomy — trusted details reach clients verbatim, internal
//!   details are logged in full and masked as a generic 500
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - Graceful shutdown — SIGTERM / Ctrl-C / handler-reported integrity
//!   failures all drain in-flight work within a bounded grace period
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plinth::middleware::{Errors, Logger, Panics, mw};
//! use plinth::{App, Ctx, Error, Method, Request, Responder, Server, Shutdown, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let shutdown = Shutdown::new();
//!
//!     let app = App::new(shutdown, [mw(Logger), mw(Errors), mw(Panics)])
//!         .on(Method::GET, "/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").await?.serve(app).await
//! }
//!
//! async fn get_user(ctx: Ctx, res: Responder, req: Request) -> Result<(), Error> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     res.respond(&ctx, &serde_json::json!({"id": id}), StatusCode::OK)
//! }
//! ```
//!
//! Handlers commit their response through the [`Responder`] and report
//! failures by returning an [`Error`]. What the client sees on failure is
//! decided in exactly one place, the [`Errors`](middleware::Errors)
//! middleware, and what the operator sees is decided by
//! [`Logger`](middleware::Logger). A handler that discovers unrecoverable
//! corruption returns [`Error::shutdown`], and the whole process drains.

mod ctx;
mod error;
mod handler;
mod request;
mod responder;
mod response;
mod router;
mod server;
mod shutdown;

pub mod auth;
pub mod health;
pub mod middleware;

pub use ctx::Ctx;
pub use error::{Error, ErrorBody, RequestError};
pub use handler::Handler;
#[doc(hidden)]
pub use handler::{BoxedHandler, ErasedHandler};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use responder::Responder;
pub use response::Response;
pub use router::App;
pub use server::Server;
pub use shutdown::Shutdown;
