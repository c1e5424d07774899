//! Enumerated value objects shared across entities.

use serde::{Deserialize, Serialize};

/// Account lifecycle state. Distinct from role — a suspended operator is
/// still an operator, just unable to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
    Disabled,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "disabled" => Ok(Self::Disabled),
            _ => Err(()),
        }
    }
}

/// Billing cycle lengths, §4.7.2. Month-based cycles preserve day-of-month
/// and clamp to the target month's last day (see `BillingCycle::add_to`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Daily,
    Weekly,
    Monthly,
    ThreeMonths,
    HalfYear,
    Yearly,
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::ThreeMonths => write!(f, "three_months"),
            Self::HalfYear => write!(f, "half_year"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "three_months" => Ok(Self::ThreeMonths),
            "half_year" => Ok(Self::HalfYear),
            "yearly" => Ok(Self::Yearly),
            _ => Err(()),
        }
    }
}

/// Shared-bundle lifecycle state, §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Pending,
    Uploading,
    Ready,
    Downloading,
    AuthError,
    ProxyError,
    Disabled,
}

impl std::fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Uploading => write!(f, "uploading"),
            Self::Ready => write!(f, "ready"),
            Self::Downloading => write!(f, "downloading"),
            Self::AuthError => write!(f, "auth_error"),
            Self::ProxyError => write!(f, "proxy_error"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl BundleStatus {
    /// `request-download` is only valid from ready/downloading (§4.6 table:
    /// "downloading" is a bookkeeping label identical to ready for callers).
    pub fn is_downloadable(&self) -> bool {
        matches!(self, Self::Ready | Self::Downloading)
    }
}

/// Why a `SessionActivity` row stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    Manual,
    NewLogin,
    ForcedByAdmin,
    TokenExpired,
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::NewLogin => write!(f, "new_login"),
            Self::ForcedByAdmin => write!(f, "forced_by_admin"),
            Self::TokenExpired => write!(f, "token_expired"),
        }
    }
}

/// Security-alert classification, §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    FailedLogin,
    MultipleDeviceLogin,
    SuspiciousLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

/// Billing-history audit event kinds, §3/§4.7.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingEventKind {
    CycleStarted,
    PaymentAdded,
    TrialStarted,
    AutoDisabled,
}

/// A user's derived billing posture, §4.7.3 `status()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BillingStatus {
    Active { days_remaining: i64 },
    Expired,
    NoPlan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_downloadable_states() {
        assert!(BundleStatus::Ready.is_downloadable());
        assert!(BundleStatus::Downloading.is_downloadable());
        assert!(!BundleStatus::Pending.is_downloadable());
        assert!(!BundleStatus::AuthError.is_downloadable());
    }

    #[test]
    fn user_status_round_trips_through_str() {
        for s in ["active", "suspended", "disabled"] {
            assert_eq!(s.parse::<UserStatus>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn alert_severity_orders_low_below_high() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
    }
}
