//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: request logging, error translation, panic
//! recovery, and credential checks.
//!
//! A middleware is a wrapper around a handler that yields another handler,
//! so a chain composes into a single erased handler once at registration
//! time rather than per request. Order is positional: the first entry in a
//! list wraps everything after it and therefore runs first on the way in
//! and last on the way out.
//!
//! The shipped set, in the order applications conventionally install them:
//!
//! - [`Logger`] outermost, so it observes the request's final status even
//!   when produced by a layer below it.
//! - [`Errors`] next, so every error escaping the layers below is
//!   translated into a response exactly once.
//! - [`Panics`] inside `Errors`, so a recovered panic surfaces as an error
//!   the translation layer already knows how to handle.
//! - [`Authenticate`] and [`Authorize`] per route, innermost, so unauthorized
//!   requests are still logged and their rejections still translated.

use std::sync::Arc;

use crate::handler::BoxedHandler;

mod auth;
mod errors;
mod logger;
mod panics;

pub use auth::{Authenticate, Authorize};
pub use errors::Errors;
pub use logger::Logger;
pub use panics::Panics;

/// Wraps a handler in additional behavior.
///
/// Implementations capture whatever configuration they need and must be
/// shareable across requests.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Erases a middleware for storage in a chain.
///
/// Purely a readability shim so registration sites read
/// `[mw(Logger), mw(Errors), mw(Panics)]` rather than a pile of casts.
pub fn mw<M: Middleware>(middleware: M) -> Arc<dyn Middleware> {
    Arc::new(middleware)
}

/// Folds a chain around a handler, first entry outermost.
pub(crate) fn wrap(chain: &[Arc<dyn Middleware>], handler: BoxedHandler) -> BoxedHandler {
    chain
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ctx::Ctx;
    use crate::error::Error;
    use crate::handler::Handler;
    use crate::request::Request;
    use crate::responder::Responder;

    /// Records entry into the wrapped handler so tests can observe ordering.
    struct Labeled {
        label: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Labeled {
        fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
            let label = self.label;
            let seen = Arc::clone(&self.seen);
            (move |ctx: Ctx, res: Responder, req: Request| {
                let next = Arc::clone(&next);
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(label);
                    next.call(ctx, res, req).await
                }
            })
            .into_boxed()
        }
    }

    fn empty_request() -> Request {
        Request::new(
            http::Method::GET,
            "/order".parse().unwrap(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
        )
    }

    #[tokio::test]
    async fn first_entry_runs_outermost() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = [
            mw(Labeled {
                label: "outer",
                seen: Arc::clone(&seen),
            }),
            mw(Labeled {
                label: "inner",
                seen: Arc::clone(&seen),
            }),
        ];

        let handler_seen = Arc::clone(&seen);
        let handler = (move |_ctx: Ctx, _res: Responder, _req: Request| {
            let seen = Arc::clone(&handler_seen);
            async move {
                seen.lock().unwrap().push("handler");
                Ok::<(), Error>(())
            }
        })
        .into_boxed();

        let wrapped = wrap(&chain, handler);
        let ctx = Ctx::new(None);
        wrapped
            .call(ctx, Responder::new(), empty_request())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner", "handler"]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler_itself() {
        let handler = (|_ctx: Ctx, res: Responder, _req: Request| async move {
            assert!(!res.sent());
            Ok::<(), Error>(())
        })
        .into_boxed();

        let wrapped = wrap(&[], handler);
        wrapped
            .call(Ctx::new(None), Responder::new(), empty_request())
            .await
            .unwrap();
    }
}
