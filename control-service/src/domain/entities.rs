//! Domain entities, §3.
//!
//! Each entity mirrors a table and derives `sqlx::FromRow` for direct row
//! mapping. Entities carrying sensitive fields (`User.hashed_password`)
//! expose a safe projection type for API responses rather than a `Serialize`
//! impl on the entity itself.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::auth::UserRole;
use uuid::Uuid;

use super::value_objects::{
    AlertSeverity, AlertType, BillingCycle, BillingEventKind, BundleStatus, LogoutReason,
    UserStatus,
};

// =============================================================================
// User
// =============================================================================

/// The account record. `current_session_token`, when set, is the access
/// token of the sole session this user is permitted to act under — see the
/// invariant in `spec.md` §3.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub role: String,
    pub status: String,
    pub current_session_token: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,

    // Billing projection, §4.7.1.
    pub is_trial_active: bool,
    pub is_billing_active: bool,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub billing_cycle_start_date: Option<DateTime<Utc>>,
    pub billing_cycle_end_date: Option<DateTime<Utc>>,
    pub billing_cycle: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_str(&self.role).unwrap_or(UserRole::User)
    }

    pub fn status(&self) -> UserStatus {
        self.status.parse().unwrap_or(UserStatus::Disabled)
    }

    pub fn is_active(&self) -> bool {
        self.status() == UserStatus::Active
    }
}

/// Safe-for-API projection of `User`, omitting the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            role: user.role.clone(),
            status: user.status.clone(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub role: UserRole,
}

// =============================================================================
// SharedBundle
// =============================================================================

/// The single shared session bundle, §3/§4.6. There is at most one row.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedBundle {
    pub bundle_id: Uuid,
    pub name: String,
    pub status: String,
    pub bundle_key: Option<String>,
    pub checksum: Option<String>,
    pub bundle_version: i32,
    pub domain_id: Option<Uuid>,
    pub proxy_id: Option<Uuid>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SharedBundle {
    pub fn status(&self) -> BundleStatus {
        match self.status.as_str() {
            "pending" => BundleStatus::Pending,
            "uploading" => BundleStatus::Uploading,
            "ready" => BundleStatus::Ready,
            "downloading" => BundleStatus::Downloading,
            "auth_error" => BundleStatus::AuthError,
            "proxy_error" => BundleStatus::ProxyError,
            _ => BundleStatus::Disabled,
        }
    }
}

// =============================================================================
// LoginHistory
// =============================================================================

/// Append-only record of one login attempt, §3. `user_id` is only populated
/// when the email matched an existing account (open question #1, resolved:
/// don't record attempts against nonexistent emails).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistory {
    pub login_history_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_fingerprint: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewLoginHistory {
    pub user_id: Uuid,
    pub email: String,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_fingerprint: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

// =============================================================================
// SessionActivity
// =============================================================================

/// One row per successful login, §3. `session_token` is rewritten in place
/// on refresh (open question #3, resolved as a bug fix).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivity {
    pub session_activity_id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub login_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub is_active: bool,
    pub logout_at: Option<DateTime<Utc>>,
    pub logout_reason: Option<String>,
}

pub struct NewSessionActivity {
    pub user_id: Uuid,
    pub session_token: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// =============================================================================
// SecurityAlert
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub alert_id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub user_id: Option<Uuid>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewSecurityAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub metadata: serde_json::Value,
    pub user_id: Option<Uuid>,
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub cycle: String,
    pub payment_date: DateTime<Utc>,
    pub cycle_start_date: DateTime<Utc>,
    pub cycle_end_date: DateTime<Utc>,
    pub memo: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

pub struct NewPayment {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub cycle: BillingCycle,
    pub cycle_start_date: DateTime<Utc>,
    pub cycle_end_date: DateTime<Utc>,
    pub memo: Option<String>,
    pub created_by: Uuid,
}

// =============================================================================
// BillingHistory
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingHistoryEntry {
    pub billing_history_id: Uuid,
    pub user_id: Uuid,
    pub event: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct NewBillingHistoryEntry {
    pub user_id: Uuid,
    pub event: BillingEventKind,
    pub metadata: serde_json::Value,
}

// =============================================================================
// AuditLog
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub audit_log_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct NewAuditLogEntry {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

// =============================================================================
// Domain / Proxy (configuration catalog, annotation-only)
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub domain_id: Uuid,
    pub hostname: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    pub proxy_id: Uuid,
    pub host: String,
    pub port: i32,
    pub username: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: &str, status: &str) -> User {
        let now = Utc::now();
        User {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            hashed_password: "hash".into(),
            role: role.into(),
            status: status.into(),
            current_session_token: None,
            last_login_at: None,
            last_login_ip: None,
            is_trial_active: false,
            is_billing_active: false,
            trial_start_date: None,
            trial_end_date: None,
            billing_cycle_start_date: None,
            billing_cycle_end_date: None,
            billing_cycle: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_role_string_degrades_to_user() {
        let user = sample_user("bogus", "active");
        assert_eq!(user.role(), UserRole::User);
    }

    #[test]
    fn is_active_reflects_status_column() {
        assert!(sample_user("user", "active").is_active());
        assert!(!sample_user("user", "disabled").is_active());
    }

    #[test]
    fn profile_projection_omits_password_hash() {
        let user = sample_user("operator", "active");
        let profile = UserProfile::from(&user);
        assert_eq!(profile.email, user.email);
        // UserProfile has no hashed_password field; this is a compile-time
        // guarantee, exercised here only to document the intent.
        assert_eq!(profile.role, "operator");
    }
}
