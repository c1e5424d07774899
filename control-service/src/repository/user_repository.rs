//! C1 identity store, §4.1.

use shared::auth::UserRole;
use shared::errors::ApiError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{NewUser, User};

fn map_db_err(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some("users_email_key") {
            return ApiError::Conflict {
                resource: "user with this email".to_string(),
            };
        }
    }
    ApiError::DatabaseError(e)
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Locks the user row for the duration of the caller's transaction.
    /// Used by the login pipeline (§4.5.2 steps 4-8) and the refresh path
    /// to serialize concurrent mutations to `currentSessionToken`.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_err)
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, hashed_password, role, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_user.email.to_lowercase())
        .bind(new_user.hashed_password)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    pub async fn count_by_role(&self, role: UserRole) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Forbids demoting the final operator-root (§4.1 invariant).
    pub async fn update_role(&self, user_id: Uuid, new_role: UserRole) -> Result<User, ApiError> {
        let target = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: "user".to_string(),
            })?;

        if target.role() == UserRole::OperatorRoot
            && new_role != UserRole::OperatorRoot
            && self.count_by_role(UserRole::OperatorRoot).await? <= 1
        {
            return Err(ApiError::LastOperatorRoot {
                reason: "cannot demote the only remaining operator-root".to_string(),
            });
        }

        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = now() WHERE user_id = $2 RETURNING *",
        )
        .bind(new_role.as_str())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    pub async fn update_status(&self, user_id: Uuid, status: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $1, updated_at = now() WHERE user_id = $2 RETURNING *",
        )
        .bind(status)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Generic `PATCH /users/:id`, §6. Scoped to `email` — the only field
    /// the narrower `role`/`status`/`password` sub-routes don't already
    /// own exclusively.
    pub async fn update_profile_fields(&self, user_id: Uuid, email: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = $1, updated_at = now() WHERE user_id = $2 RETURNING *",
        )
        .bind(email)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    pub async fn set_password(&self, user_id: Uuid, hashed_password: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET hashed_password = $1, updated_at = now() WHERE user_id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// §4.5.2 step 6: commits the winning session's token inside the
    /// caller's transaction.
    pub async fn set_current_session_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        token: &str,
        login_ip: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET current_session_token = $1, last_login_at = now(), last_login_ip = $2, updated_at = now()
            WHERE user_id = $3
            "#,
        )
        .bind(token)
        .bind(login_ip)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Used by refresh (§4.5.3) outside a login transaction.
    pub async fn replace_current_session_token(
        &self,
        user_id: Uuid,
        new_token: &str,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET current_session_token = $1, updated_at = now() WHERE user_id = $2")
            .bind(new_token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    pub async fn clear_current_session_token(&self, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET current_session_token = NULL, updated_at = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    pub async fn update_billing_fields(&self, user: &User) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                is_trial_active = $1,
                is_billing_active = $2,
                trial_start_date = $3,
                trial_end_date = $4,
                billing_cycle_start_date = $5,
                billing_cycle_end_date = $6,
                billing_cycle = $7,
                updated_at = now()
            WHERE user_id = $8
            RETURNING *
            "#,
        )
        .bind(user.is_trial_active)
        .bind(user.is_billing_active)
        .bind(user.trial_start_date)
        .bind(user.trial_end_date)
        .bind(user.billing_cycle_start_date)
        .bind(user.billing_cycle_end_date)
        .bind(&user.billing_cycle)
        .bind(user.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// §3: "Deletion is forbidden for the last operator-root."
    pub async fn delete(&self, user_id: Uuid) -> Result<(), ApiError> {
        let target = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: "user".to_string(),
            })?;

        if target.role() == UserRole::OperatorRoot
            && self.count_by_role(UserRole::OperatorRoot).await? <= 1
        {
            return Err(ApiError::LastOperatorRoot {
                reason: "cannot delete the only remaining operator-root".to_string(),
            });
        }

        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, ApiError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    pub async fn users_with_expired_billing(&self) -> Result<Vec<User>, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE status <> 'disabled'
              AND (
                (is_billing_active AND billing_cycle_end_date < now())
                OR (is_trial_active AND trial_end_date < now())
              )
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// §4.7.5's optimistic guard: only rows still non-disabled are touched.
    pub async fn disable_if_not_already(&self, user_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = 'disabled',
                is_trial_active = false,
                is_billing_active = false,
                updated_at = now()
            WHERE user_id = $1 AND status <> 'disabled'
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
