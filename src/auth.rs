//! Claims, credential validation, and authorization rules.
//!
//! The framework does not know what a token looks like. Credential
//! validation is a collaborator consumed through the narrow
//! [`Authenticator`] interface: the application hands one to
//! [`Authenticate`](crate::middleware::Authenticate) and gets [`Claims`]
//! attached to the request context on success. What backs it - JWT, opaque
//! session ids, a static table in tests - is its business.
//!
//! Authorization is a [`Rule`]: a stateless predicate over claims, checked
//! by [`Authorize`](crate::middleware::Authorize). Rules are plain `fn`
//! pointers on purpose. No captured state means a rule's verdict depends on
//! the claims alone, which keeps rules trivially testable and shareable
//! across routes.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// ── Claims ────────────────────────────────────────────────────────────────────

/// What an authenticated caller may act as.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

/// The authenticated identity attached to a request context.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Who the caller is.
    pub subject: String,
    /// What the caller may act as.
    pub roles: Vec<Role>,
}

impl Claims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

// ── Authenticator ─────────────────────────────────────────────────────────────

/// Validates a bearer token and produces the claims it represents.
///
/// Implementations must be pure with respect to shared mutable state: the
/// same token yields the same verdict regardless of concurrent requests.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Why a credential was rejected.
///
/// These messages are deliberately safe to show callers; the authentication
/// middleware forwards them in a trusted 401.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("expected authorization header format: Bearer <token>")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// A named, stateless authorization predicate over [`Claims`].
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    name: &'static str,
    check: fn(&Claims) -> bool,
}

impl Rule {
    /// Defines a rule. The business layer is free to add its own alongside
    /// the shipped ones.
    pub const fn new(name: &'static str, check: fn(&Claims) -> bool) -> Self {
        Self { name, check }
    }

    /// The rule's name, used in logs when it denies a request.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allows(&self, claims: &Claims) -> bool {
        (self.check)(claims)
    }
}

fn is_admin(claims: &Claims) -> bool {
    claims.has_role(Role::Admin)
}

fn is_anyone(_claims: &Claims) -> bool {
    true
}

/// Passes only callers holding [`Role::Admin`].
pub const ADMIN_ONLY: Rule = Rule::new("admin-only", is_admin);

/// Passes any authenticated caller.
pub const ANY_USER: Rule = Rule::new("any-user", is_anyone);
