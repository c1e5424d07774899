//! C5 — auth & single-session engine (CORE), §4.5. The login pipeline,
//! refresh contract, and logout/logout-all. Steps 4-8 of login run inside
//! one transaction holding `SELECT ... FOR UPDATE` on the user row, which
//! is this implementation's chosen mechanism for the concurrent-login
//! tie-breaking requirement (§4.5.2, scenario S6): the later committer's
//! write to `currentSessionToken` wins, and the earlier one is silently
//! overwritten rather than rejected.

use chrono::Utc;
use serde_json::json;
use shared::auth::jwt::{JwtService, TokenPair};
use shared::auth::password::PasswordHasher;
use shared::errors::ApiError;
use shared::redis_client::RedisClient;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::value_objects::{AlertSeverity, AlertType, BillingStatus};
use crate::domain::{NewLoginHistory, NewSecurityAlert, NewSessionActivity, UserProfile};
use crate::repository::{LoginHistoryRepository, SecurityAlertRepository, SessionActivityRepository, UserRepository};
use crate::service::billing_service::BillingService;
use crate::service::geolocation::{self, GeolocationService};

/// Window beyond which a failed-login counter escalates to HIGH severity.
const FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD: i64 = 5;

/// §4.5.2 step 2: MEDIUM below the threshold, HIGH at or above it.
fn failed_login_severity(attempts: i64) -> AlertSeverity {
    if attempts >= FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

pub struct LoginInput {
    pub email: String,
    pub password: String,
    #[allow(dead_code)]
    pub mac_address: Option<String>,
    #[allow(dead_code)]
    pub device_metadata: Option<serde_json::Value>,
    pub ip: String,
    pub user_agent: String,
}

pub struct LoginOutcome {
    pub profile: UserProfile,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    users: UserRepository,
    sessions: SessionActivityRepository,
    login_history: LoginHistoryRepository,
    alerts: SecurityAlertRepository,
    billing: BillingService,
    geo: GeolocationService,
    redis: RedisClient,
    jwt: JwtService,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        users: UserRepository,
        sessions: SessionActivityRepository,
        login_history: LoginHistoryRepository,
        alerts: SecurityAlertRepository,
        billing: BillingService,
        geo: GeolocationService,
        redis: RedisClient,
        jwt: JwtService,
        hasher: PasswordHasher,
    ) -> Self {
        Self { pool, users, sessions, login_history, alerts, billing, geo, redis, jwt, hasher }
    }

    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ApiError> {
        let device = geolocation::parse_device(&input.user_agent);
        let device_fingerprint = device.fingerprint();

        // Step 1: lookup & status gate. Never writes a LoginHistory row for
        // an email that doesn't resolve to a user (§9 open question 1).
        let user = match self.users.find_by_email(&input.email).await? {
            Some(user) => user,
            None => {
                self.handle_unknown_email_attempt(&input.email).await;
                return Err(ApiError::InvalidCredentials);
            }
        };

        if !user.is_active() {
            self.record_login_history_best_effort(NewLoginHistory {
                user_id: user.user_id,
                email: input.email.clone(),
                ip_address: Some(input.ip.clone()),
                city: None,
                country: None,
                latitude: None,
                longitude: None,
                device_fingerprint: Some(device_fingerprint.clone()),
                success: false,
                failure_reason: Some("account_not_active".to_string()),
            })
            .await;
            return Err(ApiError::InactiveAccount);
        }

        // Step 2: password verify.
        if !self.hasher.verify(&input.password, &user.hashed_password)? {
            self.record_login_history_best_effort(NewLoginHistory {
                user_id: user.user_id,
                email: input.email.clone(),
                ip_address: Some(input.ip.clone()),
                city: None,
                country: None,
                latitude: None,
                longitude: None,
                device_fingerprint: Some(device_fingerprint.clone()),
                success: false,
                failure_reason: Some("bad_password".to_string()),
            })
            .await;

            let attempts = self.redis.increment_failed_login(&input.email).await.unwrap_or(1);
            let severity = failed_login_severity(attempts);
            self.record_alert_best_effort(NewSecurityAlert {
                alert_type: AlertType::FailedLogin,
                severity,
                message: format!("Failed login attempt for {}", user.email),
                metadata: json!({ "email": user.email, "ip": input.ip, "attempt": attempts }),
                user_id: Some(user.user_id),
            })
            .await;

            return Err(ApiError::InvalidCredentials);
        }

        // Step 3: billing gate. Does not disable the account here — that's
        // the sweeper's job (§4.7.5).
        if matches!(self.billing.status_for(&user), BillingStatus::Expired) {
            return Err(ApiError::BillingExpired);
        }

        let _ = self.redis.reset_failed_login(&input.email).await;

        // Step 5: mint tokens ahead of the transaction; minting is a pure
        // CPU operation and doesn't need the row lock.
        let tokens = self.jwt.generate_tokens(user.user_id, &user.email, user.role().as_str())?;

        let location = self.geo.resolve_location(&input.ip).await;

        // Steps 4, 6, 7 (SessionActivity insert) run inside one transaction
        // holding a row lock on the user, so two concurrent logins commit
        // serially and the later one's state wins outright.
        let mut tx = self.pool.begin().await.map_err(ApiError::DatabaseError)?;

        self.users
            .find_by_id_for_update(&mut tx, user.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        let previous_sessions = self
            .sessions
            .invalidate_active_for_user(&mut tx, user.user_id, "new_login")
            .await?;

        self.users
            .set_current_session_token(&mut tx, user.user_id, &tokens.access_token, Some(&input.ip))
            .await?;

        self.sessions
            .create(
                &mut tx,
                NewSessionActivity {
                    user_id: user.user_id,
                    session_token: tokens.access_token.clone(),
                    device_fingerprint: Some(device_fingerprint.clone()),
                    ip_address: Some(input.ip.clone()),
                    city: location.as_ref().and_then(|l| l.city.clone()),
                    country: location.as_ref().and_then(|l| l.country.clone()),
                    latitude: location.as_ref().map(|l| l.latitude),
                    longitude: location.as_ref().map(|l| l.longitude),
                },
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(user_id = %user.user_id, "login succeeded");

        // Step 7 (history) and step 8 (alerting) happen after the critical
        // commit, per §7's failure-ordering policy: a failure here is
        // logged and swallowed, never rolled back into the login result.
        self.record_login_history_best_effort(NewLoginHistory {
            user_id: user.user_id,
            email: input.email.clone(),
            ip_address: Some(input.ip.clone()),
            city: location.as_ref().and_then(|l| l.city.clone()),
            country: location.as_ref().and_then(|l| l.country.clone()),
            latitude: location.as_ref().map(|l| l.latitude),
            longitude: location.as_ref().map(|l| l.longitude),
            device_fingerprint: Some(device_fingerprint.clone()),
            success: true,
            failure_reason: None,
        })
        .await;

        self.emit_displacement_alerts(&user.email, user.user_id, &previous_sessions, &device_fingerprint, location.as_ref())
            .await;

        Ok(LoginOutcome { profile: UserProfile::from(&user), tokens })
    }

    /// Step 8: fires the multiple-device alert if a prior session was
    /// displaced, and the suspicious-travel alert if the new location is
    /// implausibly far from the displaced session's last known location.
    async fn emit_displacement_alerts(
        &self,
        email: &str,
        user_id: Uuid,
        previous_sessions: &[crate::domain::SessionActivity],
        new_device_fingerprint: &str,
        new_location: Option<&geolocation::ResolvedLocation>,
    ) {
        let Some(previous) = previous_sessions.first() else { return };

        self.record_alert_best_effort(NewSecurityAlert {
            alert_type: AlertType::MultipleDeviceLogin,
            severity: AlertSeverity::Medium,
            message: format!("{email} logged in from a new device, displacing a prior session"),
            metadata: json!({
                "previousDevice": previous.device_fingerprint,
                "newDevice": new_device_fingerprint,
            }),
            user_id: Some(user_id),
        })
        .await;

        let (Some(prev_lat), Some(prev_lon), Some(new_loc)) =
            (previous.latitude, previous.longitude, new_location)
        else {
            return;
        };

        let distance_km = geolocation::haversine(prev_lat, prev_lon, new_loc.latitude, new_loc.longitude);
        let delta_minutes = (Utc::now() - previous.last_activity_at).num_seconds() as f64 / 60.0;

        if geolocation::is_suspicious_travel(distance_km, delta_minutes) {
            self.record_alert_best_effort(NewSecurityAlert {
                alert_type: AlertType::SuspiciousLocation,
                severity: AlertSeverity::High,
                message: format!(
                    "{email} logged in {distance_km:.0}km from the previous session within {delta_minutes:.0} minutes"
                ),
                metadata: json!({ "distanceKm": distance_km, "deltaMinutes": delta_minutes }),
                user_id: Some(user_id),
            })
            .await;
        }
    }

    /// §4.5.3: verifies the refresh token, mints a brand new pair, and
    /// rewrites both `User.currentSessionToken` and the active
    /// `SessionActivity.sessionToken` (the bug-fix resolution of open
    /// question 3) so the activity row survives refresh instead of
    /// silently going stale.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if !user.is_active() {
            return Err(ApiError::InactiveAccount);
        }

        let tokens = self.jwt.generate_tokens(user.user_id, &user.email, user.role().as_str())?;

        self.users.replace_current_session_token(user.user_id, &tokens.access_token).await?;
        self.sessions.rewrite_session_token(user.user_id, &tokens.access_token).await?;

        info!(user_id = %user.user_id, "token refreshed");
        Ok(tokens)
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.users.clear_current_session_token(user_id).await?;
        self.sessions.logout_all_for_user(user_id, "manual").await?;
        Ok(())
    }

    /// Used by operator-initiated force-logout, distinct only in the
    /// recorded `logoutReason`.
    pub async fn force_logout(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.users.clear_current_session_token(user_id).await?;
        self.sessions.logout_all_for_user(user_id, "forced_by_admin").await?;
        Ok(())
    }

    async fn handle_unknown_email_attempt(&self, email: &str) {
        let attempts = match self.redis.increment_failed_login(email).await {
            Ok(count) => count,
            Err(err) => {
                warn!(%err, "failed to track brute-force attempt for unknown email");
                return;
            }
        };

        if attempts == FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD {
            self.record_alert_best_effort(NewSecurityAlert {
                alert_type: AlertType::FailedLogin,
                severity: AlertSeverity::High,
                message: format!("Repeated failed logins against a nonexistent account: {email}"),
                metadata: json!({ "email": email, "attempts": attempts }),
                user_id: None,
            })
            .await;
        }
    }

    async fn record_login_history_best_effort(&self, params: NewLoginHistory) {
        if let Err(err) = self.login_history.create(params).await {
            tracing::error!(%err, "failed to record login history entry");
        }
    }

    async fn record_alert_best_effort(&self, params: NewSecurityAlert) {
        if let Err(err) = self.alerts.create(params).await {
            tracing::error!(%err, "failed to record security alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_login_severity_stays_medium_below_threshold() {
        for attempts in 1..FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD {
            assert_eq!(failed_login_severity(attempts), AlertSeverity::Medium);
        }
    }

    #[test]
    fn failed_login_severity_escalates_at_threshold() {
        assert_eq!(failed_login_severity(FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD), AlertSeverity::High);
        assert_eq!(failed_login_severity(FAILED_LOGIN_HIGH_SEVERITY_THRESHOLD + 1), AlertSeverity::High);
    }
}
