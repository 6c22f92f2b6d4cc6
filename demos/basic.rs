//! Minimal service wired on plinth — a flaky endpoint, an admin-gated
//! endpoint, and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/test
//!   curl -i http://localhost:3000/test/auth
//!   curl -i http://localhost:3000/test/auth -H 'authorization: Bearer user-token'
//!   curl -i http://localhost:3000/test/auth -H 'authorization: Bearer admin-token'
//!   curl -i http://localhost:3000/healthz

use std::sync::Arc;

use plinth::auth::{ADMIN_ONLY, AuthError, Authenticator, Claims, Role};
use plinth::middleware::{Authenticate, Authorize, Errors, Logger, Panics, mw};
use plinth::{App, Ctx, Error, Method, Request, Responder, Server, Shutdown, StatusCode, health};
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let shutdown = Shutdown::new();
    let tokens = Arc::new(TokenTable);

    let app = App::new(shutdown, [mw(Logger), mw(Errors), mw(Panics)])
        .on(Method::GET, "/test", test)
        .on_with(
            Method::GET,
            "/test/auth",
            test,
            vec![
                mw(Authenticate::new(tokens)),
                mw(Authorize::new(ADMIN_ONLY)),
            ],
        )
        .on(Method::GET, "/healthz", health::liveness)
        .on(Method::GET, "/readyz", health::readiness);

    Server::bind("0.0.0.0:3000").await?.serve(app).await
}

#[derive(Serialize)]
struct AppStatus {
    #[serde(rename = "Status")]
    status: &'static str,
}

// Fails on roughly half its calls: the client gets a masked 500, the log
// carries the real message.
async fn test(ctx: Ctx, res: Responder, _req: Request) -> Result<(), Error> {
    if ctx.trace_id().as_bytes()[0] % 2 == 0 {
        return Err(Error::internal(anyhow::anyhow!("untrusted error")));
        //return Err(Error::trusted(StatusCode::BAD_REQUEST, "trusted error"));
        //return Err(Error::shutdown("restart service"));
        //panic!("testing panic");
    }

    res.respond(&ctx, &AppStatus { status: "OK" }, StatusCode::OK)
}

/// Accepts two fixed tokens. A real service would verify a signed token
/// here instead.
struct TokenTable;

impl Authenticator for TokenTable {
    fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        match token {
            "admin-token" => Ok(Claims {
                subject: "admin".into(),
                roles: vec![Role::Admin, Role::User],
            }),
            "user-token" => Ok(Claims {
                subject: "user".into(),
                roles: vec![Role::User],
            }),
            other => Err(AuthError::InvalidToken(other.to_owned())),
        }
    }
}
