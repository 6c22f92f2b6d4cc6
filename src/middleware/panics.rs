//! Panic recovery.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::responder::Responder;

/// Converts a panicking handler into an [`Error::Fault`] instead of letting
/// the panic take down the connection task.
///
/// Installed inside [`Errors`](crate::middleware::Errors): a recovered panic
/// is then just another error, logged in full and masked from the client as
/// a generic 500.
pub struct Panics;

impl Middleware for Panics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (move |ctx: Ctx, res: Responder, req: Request| {
            let next = Arc::clone(&next);
            async move {
                // All request state is owned by this call; nothing a panic
                // could leave half-updated survives past it. The responder
                // slot never holds its lock across user code.
                match AssertUnwindSafe(next.call(ctx, res, req))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => Err(Error::Fault(panic_message(&payload))),
                }
            }
        })
        .into_boxed()
    }
}

/// Extracts the human-readable message from a panic payload. `panic!` with a
/// literal yields `&str`; `panic!` with a format string yields `String`.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
