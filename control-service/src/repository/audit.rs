//! C4 audit stores: LoginHistory, SessionActivity, SecurityAlert,
//! BillingHistory, AuditLog. All writes are append-only; callers treat
//! failures as best-effort (§4.4) by logging and swallowing, never
//! propagating into the originating request.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    AuditLogEntry, BillingHistoryEntry, LoginHistory, NewAuditLogEntry, NewBillingHistoryEntry,
    NewLoginHistory, NewSecurityAlert, NewSessionActivity, SecurityAlert, SessionActivity,
};

fn db_err(e: sqlx::Error) -> ApiError {
    ApiError::DatabaseError(e)
}

#[derive(Clone)]
pub struct LoginHistoryRepository {
    pool: PgPool,
}

impl LoginHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, params: NewLoginHistory) -> Result<LoginHistory, ApiError> {
        sqlx::query_as::<_, LoginHistory>(
            r#"
            INSERT INTO login_history
                (login_history_id, user_id, email, ip_address, city, country, latitude,
                 longitude, device_fingerprint, success, failure_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.email)
        .bind(params.ip_address)
        .bind(params.city)
        .bind(params.country)
        .bind(params.latitude)
        .bind(params.longitude)
        .bind(params.device_fingerprint)
        .bind(params.success)
        .bind(params.failure_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<LoginHistory>, ApiError> {
        sqlx::query_as::<_, LoginHistory>(
            "SELECT * FROM login_history WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

}

#[derive(Clone)]
pub struct SessionActivityRepository {
    pool: PgPool,
}

impl SessionActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// §4.5.2 step 4, run inside the login transaction: invalidates every
    /// currently-active row for the user and returns them (so the caller
    /// can capture the previous device/location for suspicious-travel and
    /// multi-device alerting).
    pub async fn invalidate_active_for_user(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Vec<SessionActivity>, ApiError> {
        sqlx::query_as::<_, SessionActivity>(
            r#"
            UPDATE session_activity
            SET is_active = false, logout_at = now(), logout_reason = $1
            WHERE user_id = $2 AND is_active = true
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)
    }

    pub async fn create(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        params: NewSessionActivity,
    ) -> Result<SessionActivity, ApiError> {
        sqlx::query_as::<_, SessionActivity>(
            r#"
            INSERT INTO session_activity
                (session_activity_id, user_id, session_token, device_fingerprint, ip_address,
                 city, country, latitude, longitude, login_at, last_activity_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now(), true)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.session_token)
        .bind(params.device_fingerprint)
        .bind(params.ip_address)
        .bind(params.city)
        .bind(params.country)
        .bind(params.latitude)
        .bind(params.longitude)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_err)
    }

    pub async fn find_active_by_token(&self, token: &str) -> Result<Option<SessionActivity>, ApiError> {
        sqlx::query_as::<_, SessionActivity>(
            "SELECT * FROM session_activity WHERE session_token = $1 AND is_active = true",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// §4.5.4 step 4: best-effort heartbeat, called from the session guard.
    pub async fn touch_last_activity(&self, session_activity_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE session_activity SET last_activity_at = now() WHERE session_activity_id = $1")
            .bind(session_activity_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// §4.5.3's bug fix (open question #3): rewrites `sessionToken` on the
    /// user's sole active row, so the activity's identity survives refresh
    /// instead of going silently stale. Refresh only carries the refresh
    /// token, never the superseded access token, so the match key is
    /// `user_id`, not the old token value.
    pub async fn rewrite_session_token(
        &self,
        user_id: Uuid,
        new_token: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE session_activity SET session_token = $1 WHERE user_id = $2 AND is_active = true",
        )
        .bind(new_token)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn logout(&self, session_activity_id: Uuid, reason: &str) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE session_activity SET is_active = false, logout_at = now(), logout_reason = $1 WHERE session_activity_id = $2",
        )
        .bind(reason)
        .bind(session_activity_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn logout_all_for_user(&self, user_id: Uuid, reason: &str) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE session_activity SET is_active = false, logout_at = now(), logout_reason = $1 WHERE user_id = $2 AND is_active = true",
        )
        .bind(reason)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct SecurityAlertRepository {
    pool: PgPool,
}

impl SecurityAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, params: NewSecurityAlert) -> Result<SecurityAlert, ApiError> {
        sqlx::query_as::<_, SecurityAlert>(
            r#"
            INSERT INTO security_alerts
                (alert_id, alert_type, severity, message, metadata, user_id, is_read, is_dismissed)
            VALUES ($1, $2, $3, $4, $5, $6, false, false)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.alert_type)
        .bind(params.severity)
        .bind(params.message)
        .bind(params.metadata)
        .bind(params.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<SecurityAlert>, ApiError> {
        sqlx::query_as::<_, SecurityAlert>(
            "SELECT * FROM security_alerts WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn unread_count(&self) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM security_alerts WHERE is_read = false")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn mark_read(&self, alert_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE security_alerts SET is_read = true WHERE alert_id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn dismiss(&self, alert_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE security_alerts SET is_dismissed = true WHERE alert_id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct BillingHistoryRepository {
    pool: PgPool,
}

impl BillingHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, params: NewBillingHistoryEntry) -> Result<BillingHistoryEntry, ApiError> {
        sqlx::query_as::<_, BillingHistoryEntry>(
            r#"
            INSERT INTO billing_history (billing_history_id, user_id, event, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.event)
        .bind(params.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<BillingHistoryEntry>, ApiError> {
        sqlx::query_as::<_, BillingHistoryEntry>(
            "SELECT * FROM billing_history WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, params: NewAuditLogEntry) -> Result<AuditLogEntry, ApiError> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            INSERT INTO audit_log (audit_log_id, actor_id, action, target_type, target_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.actor_id)
        .bind(params.action)
        .bind(params.target_type)
        .bind(params.target_id)
        .bind(params.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
