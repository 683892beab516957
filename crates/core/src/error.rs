//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Infrastructure
/// concerns (store conflicts, IO) belong to the infra layer. Most reconciliation
/// failures are deliberately non-fatal and surface as warnings instead (see the
/// assembly crate); the variants here are the ones a caller can act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. empty or structurally illegal).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An assembly-instance key could not be decoded.
    #[error("malformed assembly key: {0}")]
    MalformedKey(String),

    /// A consumption entry carried a level code the dispatch table does not know.
    #[error("unresolved consumption level: {0}")]
    UnresolvedLevel(u32),

    /// No matching group document exists for the addressed target.
    #[error("target not found: {0}")]
    TargetNotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn malformed_key(msg: impl Into<String>) -> Self {
        Self::MalformedKey(msg.into())
    }

    pub fn target_not_found(msg: impl Into<String>) -> Self {
        Self::TargetNotFound(msg.into())
    }
}
