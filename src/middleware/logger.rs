//! Request logging.

use std::sync::Arc;

use crate::ctx::Ctx;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::responder::Responder;

/// Logs the start and completion of every request passing through it.
///
/// Installed outermost so the completion line carries the final status no
/// matter which layer produced it. A status of `0` in the completion line
/// means no layer wrote a response; the server replies with a last-resort
/// status after the fact, which this middleware cannot observe.
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (move |ctx: Ctx, res: Responder, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let trace_id = ctx.trace_id();
                let method = req.method().clone();
                let path = req.path().to_owned();

                tracing::info!(%trace_id, %method, %path, "request started");

                let result = next.call(ctx.clone(), res, req).await;

                let status = ctx.status().map_or(0, |status| status.as_u16());
                let elapsed_ms = ctx.elapsed().as_millis() as u64;
                tracing::info!(%trace_id, %method, %path, status, elapsed_ms, "request completed");

                result
            }
        })
        .into_boxed()
    }
}
