//! # API Error Type
//!
//! Unified error type for storefront commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► BackendError            │
//! │         │                │             │              │                 │
//! │         │                │             │              ▼                 │
//! │         │                │             │        SessionError            │
//! │         ▼                ▼             ▼              ▼                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                          ApiError                                │  │
//! │  │   code: machine-readable (NOT_FOUND, UNAUTHORIZED, ...)          │  │
//! │  │   message: shown to the shopper as-is                            │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  Shell prints "✗ <message>"                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures (query errors, poisoned locks) are logged with their
//! detail and surfaced with a generic message.

use bazaar_core::{CoreError, ValidationError};
use bazaar_db::DbError;
use bazaar_session::{BackendError, SessionError};
use serde::Serialize;

/// API error returned from storefront commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 3f2a..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Not signed in (401)
    Unauthorized,

    /// Signed in but not allowed (403)
    Forbidden,

    /// Auth provider refused the request (bad credentials, expired link)
    AuthError,

    /// Database operation failed (500)
    DatabaseError,

    /// Business logic error (422)
    BusinessLogic,

    /// Internal server error (500)
    Internal,

    /// Cart operation failed
    CartError,

    /// Insufficient stock
    InsufficientStock,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Domain(e) => ApiError::from(e),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            e @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            e @ (CoreError::NotInCart(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::EmptyCart
            | CoreError::AmountOverflow) => ApiError::cart(e.to_string()),
            e @ CoreError::QuantityTooLarge { .. } => ApiError::validation(e.to_string()),
            e @ CoreError::InvalidOrderTransition { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            e @ CoreError::VendorNotApproved => ApiError::forbidden(e.to_string()),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts auth provider errors to API errors.
///
/// Provider messages are already written for the user and pass through.
impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Validation(e) => ApiError::from(e),
            BackendError::Database(e) => ApiError::from(e),
            BackendError::Rejected(message) => ApiError::forbidden(message),
            BackendError::Internal(e) => {
                tracing::error!("Internal auth error: {}", e);
                ApiError::internal("Something went wrong, please try again")
            }
            e => ApiError::new(ErrorCode::AuthError, e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            e @ SessionError::NotSignedIn => ApiError::new(ErrorCode::Unauthorized, e.to_string()),
            e @ SessionError::InvalidAdminPassword => {
                ApiError::new(ErrorCode::AuthError, e.to_string())
            }
            SessionError::Backend(e) => ApiError::from(e),
            SessionError::Validation(e) => ApiError::from(e),
            SessionError::Closed => ApiError::internal("Session store is shut down"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result alias for command functions.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::not_found("Product", "abc");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Product not found: abc");
    }

    #[test]
    fn test_checkout_errors_surface_from_db() {
        let err = ApiError::from(DbError::Domain(CoreError::InsufficientStock {
            product: "Kente Stole".to_string(),
            available: 1,
            requested: 3,
        }));

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("Kente Stole"));

        let err = ApiError::from(DbError::Domain(CoreError::EmptyCart));
        assert_eq!(err.code, ErrorCode::CartError);

        let err = ApiError::from(CoreError::AmountOverflow);
        assert_eq!(err.code, ErrorCode::CartError);
        assert_eq!(err.message, "Cart total is too large");
    }

    #[test]
    fn test_session_errors_keep_provider_message() {
        let err = ApiError::from(SessionError::Backend(BackendError::InvalidCredentials));
        assert_eq!(err.code, ErrorCode::AuthError);
        assert_eq!(err.message, "Invalid login credentials");

        let err = ApiError::from(SessionError::NotSignedIn);
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let err = ApiError::from(DbError::QueryFailed("syntax error near SELECT".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELECT"));
    }
}
