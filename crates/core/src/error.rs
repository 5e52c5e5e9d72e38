//! Domain error model.

use thiserror::Error;

/// Result type used across the registry.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is terminal for the call that produced it: the operation
/// aborts before touching state and nothing is appended to the audit log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The caller does not currently hold the required capability.
    #[error("unauthorized: missing capability '{0}'")]
    Unauthorized(String),

    /// An argument was malformed (e.g. an empty batch code).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation targeted a record that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is authenticated but does not own the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn unauthorized(capability: impl Into<String>) -> Self {
        Self::Unauthorized(capability.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Stable, machine-readable error kind (used in logs).
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::Conflict(_) => "conflict",
            DomainError::NotFound(_) => "not_found",
            DomainError::Forbidden(_) => "forbidden",
        }
    }
}
