//! `/api/v1/users/:id/{login-history,sessions}` and `/api/v1/alerts/*`,
//! §4.4/§4.8. Read-only views over the append-only audit stores plus the
//! alert read/dismiss actions the admin UI badge needs.

use actix_web::{web, HttpResponse};
use shared::errors::ApiError;
use uuid::Uuid;

use crate::api::dto::{MessageResponse, UnreadCountResponse};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// `GET /api/v1/users/:id/login-history`
pub async fn login_history(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entries = state
        .login_history_repository
        .list_for_user(path.into_inner(), DEFAULT_HISTORY_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// `GET /api/v1/users/:id/alerts`
pub async fn list_alerts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let alerts = state
        .security_alert_repository
        .list_for_user(path.into_inner(), DEFAULT_HISTORY_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(alerts))
}

/// `GET /api/v1/alerts/unread-count`
pub async fn unread_count(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let unread_count = state.security_alert_repository.unread_count().await?;
    Ok(HttpResponse::Ok().json(UnreadCountResponse { unread_count }))
}

/// `PATCH /api/v1/alerts/:alertId/read`
pub async fn mark_alert_read(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.security_alert_repository.mark_read(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "alert marked read".to_string() }))
}

/// `POST /api/v1/alerts/:alertId/dismiss`
pub async fn dismiss_alert(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.security_alert_repository.dismiss(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "alert dismissed".to_string() }))
}
