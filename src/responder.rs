//! The response slot handlers write into.
//!
//! A [`Responder`] is created per request and handed down the middleware
//! chain alongside the [`Ctx`]. It is a write-once slot: the first response
//! stored wins, and the server transmits whatever the slot holds once the
//! chain returns. The slot never overwrites, so a misbehaving handler that
//! errors after responding cannot clobber the bytes already committed; the
//! translation middleware checks [`sent`](Responder::sent) and only logs in
//! that case.
//!
//! [`respond`](Responder::respond) is the one success path: it serializes
//! the value to JSON, records the status code in the context (so the logger
//! can report it), and stores the response.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde::Serialize;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::response::Response;

/// Write-once slot for the response of a single request.
///
/// Cheap to clone; all clones share the slot.
#[derive(Clone, Debug)]
pub struct Responder {
    slot: Arc<Mutex<Option<Response>>>,
}

impl Responder {
    pub(crate) fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Serializes `value` to JSON and commits it with `status`.
    ///
    /// Returns an error if serialization fails or if a response was already
    /// committed; the second case is a handler contract violation and
    /// surfaces as an internal error.
    pub fn respond<T: Serialize + ?Sized>(
        &self,
        ctx: &Ctx,
        value: &T,
        status: StatusCode,
    ) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        if !self.send(Response::json(status, body)) {
            return Err(Error::internal(anyhow::anyhow!(
                "response already written for this request"
            )));
        }
        ctx.set_status(status);
        Ok(())
    }

    /// Whether a response has been committed.
    pub fn sent(&self) -> bool {
        self.lock().is_some()
    }

    /// Stores `response` if the slot is empty. Returns `false` without
    /// touching the slot otherwise.
    pub(crate) fn send(&self, response: Response) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(response);
        true
    }

    pub(crate) fn take(&self) -> Option<Response> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Response>> {
        // Nothing panics while holding the guard, so poisoning is
        // unreachable in practice.
        self.slot.lock().expect("response slot lock poisoned")
    }
}
