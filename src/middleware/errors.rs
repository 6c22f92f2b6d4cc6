//! Error translation.

use std::sync::Arc;

use http::StatusCode;

use crate::ctx::Ctx;
use crate::error::{Error, ErrorBody};
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::responder::Responder;

/// Turns errors escaping the layers below into client responses.
///
/// Every error is logged in full exactly once, here. What the client sees
/// depends on the error's kind:
///
/// - a trusted request error carries its own status and message verbatim,
/// - the shutdown sentinel becomes `503 service unavailable`,
/// - everything else becomes a generic `500 internal server error`, so
///   internal details never leak into a response body.
///
/// Only the shutdown sentinel propagates past this layer; all other errors
/// end here once a response is committed.
pub struct Errors;

impl Middleware for Errors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (move |ctx: Ctx, res: Responder, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let err = match next.call(ctx.clone(), res.clone(), req).await {
                    Ok(()) => return Ok(()),
                    Err(err) => err,
                };

                let trace_id = ctx.trace_id();
                tracing::error!(%trace_id, ?err, "request failed");

                if !res.sent() {
                    let (status, body) = match &err {
                        Error::Request(req_err) if req_err.is_trusted() => {
                            (req_err.status(), ErrorBody::new(req_err.message()))
                        }
                        Error::Shutdown(_) => (
                            StatusCode::SERVICE_UNAVAILABLE,
                            ErrorBody::new("service unavailable"),
                        ),
                        _ => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorBody::new("internal server error"),
                        ),
                    };
                    if let Err(write_err) = res.respond(&ctx, &body, status) {
                        tracing::error!(%trace_id, err = ?write_err, "writing error response");
                    }
                }

                // The sentinel keeps climbing so the dispatcher can start a
                // process-wide drain. Everything else is fully handled.
                if err.is_shutdown() {
                    return Err(err);
                }
                Ok(())
            }
        })
        .into_boxed()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use bytes::Bytes;
    use http::Method;

    use super::*;
    use crate::middleware::{mw, wrap};

    fn request() -> Request {
        Request::new(
            Method::GET,
            "/order".parse().unwrap(),
            http::HeaderMap::new(),
            Bytes::new(),
        )
    }

    async fn run(handler: BoxedHandler) -> (Ctx, Responder, Result<(), Error>) {
        let wrapped = wrap(&[mw(Errors)], handler);
        let ctx = Ctx::new(None);
        let res = Responder::new();
        let result = wrapped.call(ctx.clone(), res.clone(), request()).await;
        (ctx, res, result)
    }

    #[tokio::test]
    async fn trusted_errors_keep_their_status_and_message() {
        let handler = (|_ctx: Ctx, _res: Responder, _req: Request| async {
            Err(Error::trusted(StatusCode::CONFLICT, "order already placed"))
        })
        .into_boxed();

        let (ctx, res, result) = run(handler).await;

        assert!(result.is_ok());
        assert_eq!(ctx.status(), Some(StatusCode::CONFLICT));
        let response = res.take().unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.body(),
            br#"{"error":"order already placed"}"#.as_slice()
        );
    }

    #[tokio::test]
    async fn internal_errors_become_a_generic_500() {
        let handler = (|_ctx: Ctx, _res: Responder, _req: Request| async {
            Err(Error::internal(anyhow!("db connection refused")))
        })
        .into_boxed();

        let (_ctx, res, result) = run(handler).await;

        assert!(result.is_ok());
        let response = res.take().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body(),
            br#"{"error":"internal server error"}"#.as_slice()
        );
    }

    #[tokio::test]
    async fn untrusted_request_errors_are_masked() {
        let handler = (|_ctx: Ctx, _res: Responder, _req: Request| async {
            Err(Error::Request(crate::error::RequestError::untrusted(
                StatusCode::BAD_REQUEST,
                "constraint violation on orders.user_id",
            )))
        })
        .into_boxed();

        let (_ctx, res, _result) = run(handler).await;

        let response = res.take().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body(),
            br#"{"error":"internal server error"}"#.as_slice()
        );
    }

    #[tokio::test]
    async fn shutdown_sentinel_responds_503_and_keeps_climbing() {
        let handler = (|_ctx: Ctx, _res: Responder, _req: Request| async {
            Err(Error::shutdown("database gone"))
        })
        .into_boxed();

        let (_ctx, res, result) = run(handler).await;

        assert!(result.unwrap_err().is_shutdown());
        let response = res.take().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.body(),
            br#"{"error":"service unavailable"}"#.as_slice()
        );
    }

    #[tokio::test]
    async fn an_already_sent_response_is_left_alone() {
        let handler = (|ctx: Ctx, res: Responder, _req: Request| async move {
            res.respond(&ctx, &serde_json::json!({"partial": true}), StatusCode::OK)?;
            Err(Error::internal(anyhow!("failed after responding")))
        })
        .into_boxed();

        let (ctx, res, result) = run(handler).await;

        assert!(result.is_ok());
        assert_eq!(ctx.status(), Some(StatusCode::OK));
        let response = res.take().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
