//! Domain-level error kinds shared across every StellarOps crate.
//!
//! These map to §7 of the control-plane spec. They are deliberately not
//! tied to any transport: the HTTP/JSON API layer (out of scope for this
//! core) owns the NotFound→404 / InvalidState→409 / … mapping.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    #[error("resource insufficient: {0}")]
    ResourceInsufficient(String),

    #[error("circuit '{0}' is open")]
    CircuitOpen(String),

    #[error("operation '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::ValidationFailed(errors)
    }
}
