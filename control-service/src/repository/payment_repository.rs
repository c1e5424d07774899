//! Append-only payment ledger, §3/§4.7. Never mutated after creation —
//! user-level billing fields are a materialized projection over this table.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewPayment, Payment};

fn db_err(e: sqlx::Error) -> ApiError {
    ApiError::DatabaseError(e)
}

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, params: NewPayment) -> Result<Payment, ApiError> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (payment_id, user_id, amount, cycle, payment_date, cycle_start_date,
                 cycle_end_date, memo, created_by)
            VALUES ($1, $2, $3, $4, now(), $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.amount)
        .bind(params.cycle)
        .bind(params.cycle_start_date)
        .bind(params.cycle_end_date)
        .bind(params.memo)
        .bind(params.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>, ApiError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY payment_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
