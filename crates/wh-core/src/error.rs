//! # AppError
//!
//! Centralized error handling for the Whistly ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all wh-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Bird, Comment, Reply)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure tied to a form field (e.g., comment too long, invalid image)
    #[error("validation error on {field}: {message}")]
    ValidationError { field: &'static str, message: String },

    /// No identity was presented for a protected operation
    #[error("authentication required")]
    Unauthenticated,

    /// The identity is known but lacks the capability (e.g., editing someone else's bird)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        Self::NotFound(kind.to_string(), id.to_string())
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// Ports report failures through anyhow; adapters may wrap an `AppError`
/// (e.g. an upload that is not an image) which is recovered here.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal(format!("{other:#}")),
        }
    }
}

/// A specialized Result type for Whistly logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_wrapping_keeps_domain_errors() {
        let wrapped = anyhow::Error::new(AppError::invalid("picture", "not an image"));
        match AppError::from(wrapped) {
            AppError::ValidationError { field, .. } => assert_eq!(field, "picture"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn foreign_errors_become_internal() {
        let err = AppError::from(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, AppError::Internal(msg) if msg.contains("disk on fire")));
    }
}
