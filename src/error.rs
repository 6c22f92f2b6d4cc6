//! Error taxonomy.
//!
//! Everything a handler or middleware can fail with is one [`Error`]. The
//! taxonomy decides what the client may see:
//!
//! - **Trusted** request errors ([`Error::trusted`]) carry a status code and
//!   a message written for the client. Validation and auth failures live
//!   here.
//! - Everything else is **untrusted**: internal errors, I/O failures, and
//!   recovered panics ([`Error::Fault`]). The
//!   [`Errors`](crate::middleware::Errors) middleware logs them in full and
//!   answers with a generic 500. Their messages never reach the wire.
//! - The **shutdown sentinel** ([`Error::shutdown`]) is not a request
//!   failure at all. Returning it from any handler asks the process to
//!   drain: the client gets a 503 and the server stops accepting work.
//!
//! Errors propagate up the middleware chain unchanged; only the translation
//! middleware turns them into responses.

use http::StatusCode;
use serde::Serialize;
use thiserror::Error as ThisError;

/// The error type carried through the handler chain and returned by the
/// server's fallible operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A request-level failure with an associated status code. Client-facing
    /// only when constructed as trusted.
    #[error("{0}")]
    Request(#[from] RequestError),

    /// A recovered panic. Always untrusted.
    #[error("unexpected fault: {0}")]
    Fault(String),

    /// Any other failure. Always untrusted.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    /// Socket-level failure while binding or accepting.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The address given to [`Server::bind`](crate::Server::bind) did not
    /// parse as `host:port`.
    #[error("invalid bind address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// Sentinel asking the process to begin graceful shutdown.
    #[error("shutdown requested: {0}")]
    Shutdown(String),
}

impl Error {
    /// A trusted request error: `message` is written for the client and
    /// will be sent verbatim with `status`.
    pub fn trusted(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request(RequestError {
            status,
            message: message.into(),
            trusted: true,
        })
    }

    /// An untrusted failure. The message is logged, never sent.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// The shutdown sentinel. `message` describes why drain was requested
    /// and appears only in logs.
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown(message.into())
    }

    /// Whether this error is the shutdown sentinel.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// The status this error would surface with if it reached translation.
    /// Untrusted errors always map to 500.
    pub(crate) fn client_status(&self) -> StatusCode {
        match self {
            Self::Request(req) if req.trusted => req.status,
            Self::Shutdown(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.into())
    }
}

// ── RequestError ──────────────────────────────────────────────────────────────

/// A failure tied to a specific request, carrying an HTTP status code and a
/// message. Only errors built through [`Error::trusted`] may leak the
/// message to the client; an untrusted `RequestError` is treated exactly
/// like an internal error.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct RequestError {
    status: StatusCode,
    message: String,
    trusted: bool,
}

impl RequestError {
    /// An untrusted request error: the status is kept for internal
    /// bookkeeping but the client sees a generic 500.
    pub fn untrusted(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            trusted: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }
}

// ── Wire shape ────────────────────────────────────────────────────────────────

/// The JSON body every error response carries: `{"error": <message>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
