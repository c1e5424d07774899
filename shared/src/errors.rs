//! # Application Error Types
//!
//! Unified error handling for the control-plane service with automatic
//! HTTP conversion.
//!
//! ## Design Philosophy
//!
//! Each error variant maps to exactly one HTTP status code and error code,
//! following the error taxonomy the service contract defines: validation,
//! unauthenticated, forbidden, not-found, conflict, upstream, internal.
//!
//! ## HTTP Response Format
//!
//! ```json
//! {
//!   "code": "DISPLACED_SESSION",
//!   "message": "Session was invalidated from another device",
//!   "reason": "logged_out_from_another_device",
//!   "request_id": "550e8400-e29b-41d4-a716-446655440000",
//!   "details": { ... },
//!   "timestamp": "2024-01-15T10:30:00Z"
//! }
//! ```

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

/// Result type alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

/// Application error type with automatic HTTP status mapping.
///
/// Adding a variant: pick the HTTP status, write the `#[error]` message,
/// then wire it into `status_code()` and `error_code()`.
#[derive(Debug, Error)]
pub enum ApiError {
    // ---- unauthenticated (401) ----------------------------------------
    /// Wrong email/password. The login endpoint must not distinguish this
    /// from `unknown-email` in the response body.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bearer token signature/structure invalid.
    #[error("Invalid token")]
    InvalidToken,

    /// Bearer token parsed but past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// Request didn't carry a bearer token at all.
    #[error("Missing authentication")]
    MissingAuth,

    /// Bearer no longer matches `User.currentSessionToken`: the user logged
    /// in elsewhere and displaced this session. Carries a stable `reason`
    /// string so the desktop client can distinguish this from a plain
    /// expiry and log itself out immediately.
    #[error("Session was invalidated from another device")]
    DisplacedSession,

    // ---- forbidden (403) ------------------------------------------------
    /// Role gate rejected the caller.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Account status is not `active` (suspended or disabled).
    #[error("Account is not active")]
    InactiveAccount,

    /// Billing gate rejected login: trial or cycle has ended.
    #[error("Billing period has expired")]
    BillingExpired,

    // ---- validation (400) ------------------------------------------------
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    #[error("Invalid input: {message}")]
    BadRequest { message: String },

    #[error("Invalid UUID format")]
    InvalidUuid,

    // ---- not-found (404) --------------------------------------------------
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    // ---- conflict (409) ------------------------------------------------
    #[error("Resource already exists: {resource}")]
    Conflict { resource: String },

    /// Attempted to demote/delete the last operator-root.
    #[error("Operation would leave no operator-root: {reason}")]
    LastOperatorRoot { reason: String },

    // ---- upstream (502) -----------------------------------------------
    /// Database call failed.
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    /// Redis call failed.
    #[error("Cache error")]
    RedisError(#[from] redis::RedisError),

    /// Object-store presigned-URL issuance failed.
    #[error("Object storage error: {message}")]
    ObjectStoreError { message: String },

    /// Geolocation provider failed; callers normally swallow this and
    /// proceed with a null location instead of surfacing it, but the
    /// variant exists for the rare path that must report it.
    #[error("Geolocation provider error")]
    GeolocationError,

    // ---- internal (500) --------------------------------------------------
    #[error("Internal server error")]
    InternalError { message: String },
}

impl ApiError {
    /// Machine-readable, stable error code for API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::MissingAuth => "MISSING_AUTH",
            Self::DisplacedSession => "DISPLACED_SESSION",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::InactiveAccount => "INACTIVE_ACCOUNT",
            Self::BillingExpired => "BILLING_EXPIRED",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::InvalidUuid => "INVALID_UUID",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::LastOperatorRoot { .. } => "LAST_OPERATOR_ROOT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::RedisError(_) => "CACHE_ERROR",
            Self::ObjectStoreError { .. } => "OBJECT_STORE_ERROR",
            Self::GeolocationError => "GEOLOCATION_ERROR",
            Self::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    /// Source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::MissingAuth
            | Self::DisplacedSession => StatusCode::UNAUTHORIZED,

            Self::InsufficientPermissions | Self::InactiveAccount | Self::BillingExpired => {
                StatusCode::FORBIDDEN
            }

            Self::ValidationError(_) | Self::BadRequest { .. } | Self::InvalidUuid => {
                StatusCode::BAD_REQUEST
            }

            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            Self::Conflict { .. } | Self::LastOperatorRoot { .. } => StatusCode::CONFLICT,

            Self::DatabaseError(_)
            | Self::RedisError(_)
            | Self::ObjectStoreError { .. }
            | Self::GeolocationError => StatusCode::BAD_GATEWAY,

            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable `reason` string surfaced only for the displaced-session case;
    /// the client's polling loop keys off this exact value.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::DisplacedSession => Some("logged_out_from_another_device"),
            _ => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::RedisError(_)
                | Self::ObjectStoreError { .. }
                | Self::GeolocationError
                | Self::InternalError { .. }
        )
    }

    /// Upstream failures are logged with full detail but returned to the
    /// client with a generic message; everything else is surfaced verbatim.
    fn client_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::RedisError(_) => "A dependency is unavailable".into(),
            Self::ObjectStoreError { .. } => "Object storage is unavailable".into(),
            Self::GeolocationError => "Location lookup is unavailable".into(),
            Self::InternalError { .. } => "An internal error occurred".into(),
            other => other.to_string(),
        }
    }
}

/// Standard error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    pub fn new(error: &ApiError) -> Self {
        let details = match error {
            ApiError::ValidationError(errors) => {
                Some(serde_json::to_value(errors).unwrap_or_default())
            }
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.client_message(),
            reason: error.reason(),
            request_id: None,
            details,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "upstream/internal failure");
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "request rejected");
        }
        let response = ErrorResponse::new(self);
        HttpResponse::build(self.status_code()).json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_errors_return_401() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::DisplacedSession.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn forbidden_errors_return_403() {
        assert_eq!(ApiError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InactiveAccount.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::BillingExpired.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_errors_return_502() {
        assert_eq!(
            ApiError::ObjectStoreError { message: "x".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::GeolocationError.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn displaced_session_carries_stable_reason() {
        assert_eq!(
            ApiError::DisplacedSession.reason(),
            Some("logged_out_from_another_device")
        );
        assert_eq!(ApiError::InvalidCredentials.reason(), None);
    }

    #[test]
    fn login_credential_errors_do_not_leak_which_field_was_wrong() {
        // unknown-email and bad-password must render identically to the client
        let unknown = ApiError::InvalidCredentials;
        let bad_password = ApiError::InvalidCredentials;
        assert_eq!(
            ErrorResponse::new(&unknown).message,
            ErrorResponse::new(&bad_password).message
        );
    }

    #[test]
    fn server_errors_hide_detail_behind_generic_message() {
        let err = ApiError::InternalError { message: "stack trace here".into() };
        assert_eq!(ErrorResponse::new(&err).message, "An internal error occurred");
    }
}
