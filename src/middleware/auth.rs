//! Credential checks.
//!
//! [`Authenticate`] establishes *who* is calling; [`Authorize`] decides
//! whether that caller *may*. They are separate layers so routes can require
//! identity without a rule, and so a rule misconfigured onto a route without
//! authentication fails loudly instead of passing silently.

use std::sync::Arc;

use anyhow::anyhow;
use http::StatusCode;

use crate::auth::{AuthError, Authenticator, Rule};
use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::responder::Responder;

/// Validates the bearer token and attaches the resulting claims to the
/// request context. Rejections are trusted 401s carrying the
/// [`AuthError`] message.
pub struct Authenticate {
    auth: Arc<dyn Authenticator>,
}

impl Authenticate {
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self { auth }
    }
}

impl Middleware for Authenticate {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let auth = Arc::clone(&self.auth);
        (move |ctx: Ctx, res: Responder, req: Request| {
            let next = Arc::clone(&next);
            let auth = Arc::clone(&auth);
            async move {
                let claims = bearer_token(&req)
                    .and_then(|token| auth.authenticate(token))
                    .map_err(|err| Error::trusted(StatusCode::UNAUTHORIZED, err.to_string()))?;

                next.call(ctx.with_claims(claims), res, req).await
            }
        })
        .into_boxed()
    }
}

fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    req.header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

/// Checks the context's claims against a [`Rule`].
///
/// Requires [`Authenticate`] earlier in the chain. Reaching this layer with
/// no claims means the route was wired wrong, and that surfaces as an
/// internal error so the misconfiguration is a loud 500 in the logs rather
/// than an open door.
pub struct Authorize {
    rule: Rule,
}

impl Authorize {
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }
}

impl Middleware for Authorize {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let rule = self.rule;
        (move |ctx: Ctx, res: Responder, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let Some(claims) = ctx.claims() else {
                    return Err(Error::internal(anyhow!(
                        "authorization rule [{}] evaluated without authentication",
                        rule.name(),
                    )));
                };

                if !rule.allows(claims) {
                    return Err(Error::trusted(
                        StatusCode::FORBIDDEN,
                        format!("not authorized for that action: rule [{}]", rule.name()),
                    ));
                }

                next.call(ctx, res, req).await
            }
        })
        .into_boxed()
    }
}
