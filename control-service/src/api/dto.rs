//! Request/response DTOs for the `/api/v1` surface, §6. All JSON uses
//! `camelCase` to match the admin UI's conventions; request DTOs derive
//! `Validate` and are checked via `shared::validation::validate_request`
//! before the handler touches a single field.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::BillingStatus;
use crate::domain::SharedBundle;
use crate::domain::UserProfile;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(custom(function = "shared::validation::validators::valid_mac_address"))]
    pub mac_address: Option<String>,
    pub device_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserProfile,
    pub tokens: TokenPairDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub tokens: TokenPairDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub valid: bool,
    pub user_id: Option<Uuid>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// =============================================================================
// Bundle
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResponse {
    pub bundle_id: Uuid,
    pub name: String,
    pub status: String,
    pub bundle_version: i32,
    pub domain_id: Option<Uuid>,
    pub proxy_id: Option<Uuid>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<SharedBundle> for BundleResponse {
    fn from(bundle: SharedBundle) -> Self {
        Self {
            bundle_id: bundle.bundle_id,
            name: bundle.name,
            status: bundle.status,
            bundle_version: bundle.bundle_version,
            domain_id: bundle.domain_id,
            proxy_id: bundle.proxy_id,
            last_synced_at: bundle.last_synced_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignDomainRequest {
    pub domain_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignProxyRequest {
    pub proxy_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub url: String,
    pub bundle_key: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub url: String,
    pub bundle_key: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    #[validate(length(min = 1, message = "checksum is required"))]
    pub checksum: String,
    pub file_size_bytes: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BundleEventRequest {
    #[validate(length(min = 1, message = "level is required"))]
    pub level: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

// =============================================================================
// Billing
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartCycleRequest {
    #[validate(length(min = 1, message = "cycle is required"))]
    pub cycle: String,
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentRequest {
    #[validate(length(min = 1, message = "cycle is required"))]
    pub cycle: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetTrialRequest {
    #[validate(range(min = 1, message = "hours must be positive"))]
    pub hours: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatusResponse {
    #[serde(flatten)]
    pub status: BillingStatus,
}

// =============================================================================
// History / activity / alerts
// =============================================================================
//
// LoginHistory, SessionActivity, SecurityAlert, BillingHistoryEntry, Payment
// and AuditLogEntry already derive `Serialize` with `camelCase` renaming in
// `domain::entities`, so handlers return them directly rather than through
// a wrapper DTO.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

// =============================================================================
// Generic
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn page_query_defaults_and_clamps() {
        let empty = PageQuery { limit: None, offset: None };
        assert_eq!(empty.limit(), 50);
        assert_eq!(empty.offset(), 0);

        let oversized = PageQuery { limit: Some(10_000), offset: Some(-5) };
        assert_eq!(oversized.limit(), 200);
        assert_eq!(oversized.offset(), 0);

        let zero = PageQuery { limit: Some(0), offset: Some(3) };
        assert_eq!(zero.limit(), 1);
        assert_eq!(zero.offset(), 3);
    }

    #[test]
    fn login_request_rejects_bad_email_and_empty_password() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
            mac_address: None,
            device_metadata: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn login_request_rejects_malformed_mac_address() {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
            mac_address: Some("not-a-mac".to_string()),
            device_metadata: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn login_request_accepts_well_formed_input() {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
            mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            device_metadata: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn update_profile_request_rejects_bad_email() {
        let request = UpdateProfileRequest { email: "not-an-email".to_string() };
        assert!(request.validate().is_err());
        let request = UpdateProfileRequest { email: "alice@example.com".to_string() };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn add_payment_request_requires_nonblank_cycle() {
        let amount: Decimal = "19.99".parse().unwrap();
        let request = AddPaymentRequest { cycle: String::new(), amount, memo: None };
        assert!(request.validate().is_err());
    }

    #[test]
    fn set_trial_request_rejects_non_positive_hours() {
        assert!(SetTrialRequest { hours: 0 }.validate().is_err());
        assert!(SetTrialRequest { hours: 24 }.validate().is_ok());
    }
}
