//! Per-request context.
//!
//! Every request gets one [`Ctx`] at dispatch time carrying a v4 trace id,
//! the arrival instant, and a status-code slot. The slot exists so the
//! outermost middleware can log the status the client actually received:
//! [`Responder::respond`](crate::Responder::respond) records the status here
//! when it serializes a response, and the logger reads it back after the
//! chain returns.
//!
//! `Ctx` is a cheap handle. Clones and claim-carrying derivations made by
//! the authentication middleware all share the same trace id, start instant,
//! and status slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;

use http::StatusCode;
use uuid::Uuid;

use crate::auth::Claims;

/// Metadata shared by every clone of a request's context.
#[derive(Debug)]
struct Values {
    trace_id: Uuid,
    started: Instant,
    // 0 means no response has been recorded yet.
    status: AtomicU16,
}

/// Per-request metadata handed to every handler and middleware.
#[derive(Clone, Debug)]
pub struct Ctx {
    values: Arc<Values>,
    claims: Option<Claims>,
    deadline: Option<Instant>,
}

impl Ctx {
    pub(crate) fn new(deadline: Option<Instant>) -> Self {
        Self {
            values: Arc::new(Values {
                trace_id: Uuid::new_v4(),
                started: Instant::now(),
                status: AtomicU16::new(0),
            }),
            claims: None,
            deadline,
        }
    }

    /// Unique id for this request, present in every log line about it.
    pub fn trace_id(&self) -> Uuid {
        self.values.trace_id
    }

    /// Time elapsed since the request entered dispatch.
    pub fn elapsed(&self) -> std::time::Duration {
        self.values.started.elapsed()
    }

    /// The status code recorded by the responder, if a response has been
    /// written yet.
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.values.status.load(Ordering::Relaxed)).ok()
    }

    pub(crate) fn set_status(&self, status: StatusCode) {
        self.values.status.store(status.as_u16(), Ordering::Relaxed);
    }

    /// Deadline for this request, when the app was configured with
    /// [`request_timeout`](crate::App::request_timeout). Long-running
    /// handlers can check remaining time and bail out early.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Claims attached by the authentication middleware, if it ran.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Derives a context carrying `claims`. The trace id, start instant,
    /// and status slot stay shared with the parent context.
    pub fn with_claims(&self, claims: Claims) -> Self {
        Self {
            values: Arc::clone(&self.values),
            claims: Some(claims),
            deadline: self.deadline,
        }
    }
}
