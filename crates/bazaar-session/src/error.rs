//! # Session Error Types
//!
//! Error types for the auth backend, the session store, and their
//! supporting storage and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────────┐      ┌───────────────────────────────────┐    │
//! │  │    BackendError     │      │          SessionError             │    │
//! │  │                     │      │                                   │    │
//! │  │  UserAlreadyExists  │─────►│  Backend (verbatim, user-facing)  │    │
//! │  │  InvalidCredentials │      │  NotSignedIn                      │    │
//! │  │  SessionMissing     │      │  InvalidAdminPassword             │    │
//! │  │  Rejected           │      │  Validation                       │    │
//! │  │  Database (DbError) │      │  Closed                           │    │
//! │  └─────────────────────┘      └───────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────────┐      ┌───────────────────────────────────┐    │
//! │  │    StorageError     │      │          ConfigError              │    │
//! │  │  Io / Persist       │      │  Io / Parse / Serialize / Invalid │    │
//! │  └─────────────────────┘      └───────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `BackendError` messages are shown to the user as-is, so they read like
//! the hosted provider's own messages.

use bazaar_core::{PersistError, ValidationError};
use bazaar_db::DbError;
use thiserror::Error;

/// Result type alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type alias for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Backend Errors
// =============================================================================

/// Rejection from the auth/database service.
#[derive(Debug, Error)]
pub enum BackendError {
    // =========================================================================
    // Auth Errors
    // =========================================================================
    /// Sign-up with an email that already has an account.
    #[error("User already registered")]
    UserAlreadyRegistered,

    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The call needs a signed-in provider session.
    #[error("Auth session missing")]
    SessionMissing,

    /// Recovery token unknown, used, or expired.
    #[error("Email link is invalid or has expired")]
    InvalidRecoveryLink,

    /// OAuth callback with a state value we never issued.
    #[error("OAuth state is invalid or has already been used")]
    InvalidOAuthState,

    /// Token could not be issued or decoded.
    #[error("Token error: {0}")]
    Token(String),

    // =========================================================================
    // Row Errors
    // =========================================================================
    /// The service refused a row write (constraint or row-level policy).
    #[error("{0}")]
    Rejected(String),

    /// Input rejected before reaching the service.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failure inside the local service.
    #[error("Database error: {0}")]
    Database(DbError),

    /// Unexpected internal failure (hashing, etc).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert database errors to backend errors.
///
/// ## Error Mapping
/// - Unique violations read like the hosted database's constraint message
/// - Foreign key violations become row rejections
/// - Everything else is a database error
impl From<DbError> for BackendError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { field, .. } => BackendError::Rejected(format!(
                "duplicate key value violates unique constraint on {}",
                field
            )),
            DbError::ForeignKeyViolation { message } => BackendError::Rejected(message),
            other => BackendError::Database(other),
        }
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Failure of a [`SessionStore`](crate::SessionStore) operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a loaded user profile.
    #[error("You must be signed in to do that")]
    NotSignedIn,

    /// Admin password mismatch, or the stored value could not be read.
    #[error("Invalid admin password")]
    InvalidAdminPassword,

    /// Rejected by the backend; the message is the backend's own.
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store's event queue has shut down.
    #[error("Session store is closed")]
    Closed,
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Failure reading or writing the persisted session slice.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Failure loading, validating or saving `storefront.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No platform config directory and no explicit path.
    #[error("No config path available")]
    NoConfigPath,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_messages_are_user_facing() {
        assert_eq!(
            BackendError::UserAlreadyRegistered.to_string(),
            "User already registered"
        );
        assert_eq!(
            BackendError::InvalidCredentials.to_string(),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_unique_violation_becomes_rejection() {
        let err: BackendError = DbError::duplicate("user_id", "u-1").into();
        assert!(matches!(err, BackendError::Rejected(_)));
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_backend_error_passes_through_session_error() {
        let err: SessionError = BackendError::InvalidCredentials.into();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
