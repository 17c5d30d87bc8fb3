//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Remote      │  │      Payload            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  ConnectionFail │  │  MalformedPayload       │ │
//! │  │  InvalidUrl     │  │  Http {status}  │  │  SerializationFailed    │ │
//! │  │  MissingCreds   │  │  Timeout        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │    Internal     │                              │
//! │  │  DatabaseError  │  │  Internal       │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! │                                                                         │
//! │  Per-entry / per-table errors are logged and counted; only errors      │
//! │  escaping the cycle end up in SyncStatus.last_error.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use recicla_core::CoreError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Remote URL or key not stored in settings.
    #[error("Remote credentials not configured")]
    MissingCredentials,

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Request could not reach the remote.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Remote answered with a non-success status.
    #[error("Remote returned {status} for {table}: {message}")]
    Http {
        table: String,
        status: u16,
        message: String,
    },

    /// Remote call exceeded its deadline.
    #[error("Remote call timed out after {0} seconds")]
    Timeout(u64),

    /// Remote answered with a body we can't use.
    #[error("Unexpected remote response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Outbox payload is not a JSON object.
    #[error("Malformed payload for outbox entry {entry_id}: {reason}")]
    MalformedPayload { entry_id: i64, reason: String },

    /// Failed to serialize or deserialize JSON.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local store operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync engine error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<recicla_db::DbError> for SyncError {
    fn from(err: recicla_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MalformedPayload { entry_id, reason } => {
                SyncError::MalformedPayload { entry_id, reason }
            }
            other => SyncError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::ConnectionFailed(format!("request timed out: {err}"))
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt may succeed without any change on
    /// this device.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - HTTP 408, 429 and 5xx
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Other 4xx answers (the request itself is wrong)
    /// - Malformed payloads
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::Http { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::MissingCredentials
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("dns".into()).is_retryable());
        assert!(SyncError::Timeout(15).is_retryable());
        assert!(SyncError::Http {
            table: "material".into(),
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());

        assert!(!SyncError::Http {
            table: "material".into(),
            status: 409,
            message: "conflict".into()
        }
        .is_retryable());
        assert!(!SyncError::MissingCredentials.is_retryable());
        assert!(!SyncError::MalformedPayload {
            entry_id: 1,
            reason: "eof".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_core_error_conversion() {
        let err: SyncError = CoreError::MalformedPayload {
            entry_id: 4,
            reason: "expected value".into(),
        }
        .into();
        assert!(matches!(err, SyncError::MalformedPayload { entry_id: 4, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::Http {
            table: "item".into(),
            status: 400,
            message: "null value in column \"pedido_id\"".into(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("item"));
        assert!(SyncError::MissingCredentials.is_config_error());
    }
}
