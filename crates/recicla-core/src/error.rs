//! # Error Types
//!
//! Domain-specific error types for recicla-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  recicla-core errors (this file)                                       │
//! │  ├── CoreError        - Payload / domain failures                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  recicla-db errors                                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  recicla-sync errors                                                   │
//! │  └── SyncError        - Remote / orchestration failures                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError → last_error  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An outbox payload is not a JSON object.
    ///
    /// ## When This Occurs
    /// - Payload text is not valid JSON (truncated write, manual edit)
    /// - Payload is valid JSON but an array/scalar instead of an object
    #[error("Malformed payload for outbox entry {entry_id}: {reason}")]
    MalformedPayload { entry_id: i64, reason: String },

    /// Unknown outbox operation text.
    #[error("Unknown outbox operation: '{0}'")]
    UnknownOperation(String),

    /// Order code text does not follow `PREFIX-N`.
    #[error("Invalid order code: '{0}'")]
    InvalidOrderCode(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a value is written to SQLite or interpolated into SQL.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: f64 },

    /// Invalid format (identifier, prefix, code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::MalformedPayload {
            entry_id: 12,
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed payload for outbox entry 12: expected value at line 1 column 1"
        );

        let err = ValidationError::Required {
            field: "nome".to_string(),
        };
        assert_eq!(err.to_string(), "nome is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Negative {
            field: "preco_compra".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
