//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Missing or empty required field
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate unique name, grant triple or hierarchy edge
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Delete blocked by dependent children or live permissions
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Condition could not be evaluated
    ///
    /// Never returned from a permission check; the checker folds it into a
    /// "condition not satisfied" outcome.
    #[error("Condition evaluation failed: {0}")]
    Evaluation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classification for callers mapping errors onto their own
/// transport (HTTP status codes, CLI exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Constraint,
    Evaluation,
    Internal,
}

impl AuthzError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::Validation(_) => ErrorKind::Validation,
            AuthzError::NotFound(_) => ErrorKind::NotFound,
            AuthzError::Conflict(_) => ErrorKind::Conflict,
            AuthzError::Constraint(_) => ErrorKind::Constraint,
            AuthzError::Evaluation(_) => ErrorKind::Evaluation,
            AuthzError::Database(_) | AuthzError::Serialization(_) | AuthzError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        AuthzError::NotFound(format!("{} '{}'", entity, key))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
