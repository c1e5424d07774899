//! `/api/v1/users/*`, operator ≥, §6. Role/status/password mutations are
//! split into distinct `PATCH` sub-routes rather than one do-everything
//! update, matching §4.1's separate-operation invariants (last-operator-root
//! protection only applies to role/delete, not status/password).

use actix_web::{web, HttpResponse};
use shared::auth::middleware::AuthenticatedUser;
use shared::auth::UserRole;
use shared::errors::ApiError;
use shared::validation;
use uuid::Uuid;

use crate::api::dto::{
    CreateUserRequest, MessageResponse, PageQuery, UpdatePasswordRequest, UpdateProfileRequest,
    UpdateRoleRequest, UpdateStatusRequest,
};
use crate::api::handlers::record_audit_best_effort;
use crate::domain::{NewUser, UserProfile};
use crate::AppState;

/// `GET /api/v1/users`
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let users = state
        .user_repository
        .list(query.limit(), query.offset())
        .await?
        .iter()
        .map(UserProfile::from)
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(users))
}

/// `POST /api/v1/users`
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let role = UserRole::from_str(&body.role).ok_or_else(|| ApiError::BadRequest {
        message: format!("unknown role: {}", body.role),
    })?;
    let hashed_password = state.password_hasher.hash(&body.password)?;

    let user = state
        .user_repository
        .create(NewUser { email: body.email, hashed_password, role })
        .await?;

    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

/// `GET /api/v1/users/:id`
pub async fn get(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `PATCH /api/v1/users/:id`. Generic profile update, scoped to `email` —
/// role/status/password each have their own narrower sub-route with their
/// own invariants (last-operator-root protection, hashing).
pub async fn update(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let user_id = path.into_inner();
    let user = state.user_repository.update_profile_fields(user_id, &body.email).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.update_profile",
        "user",
        user_id,
        serde_json::json!({ "email": body.email }),
    )
    .await;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `DELETE /api/v1/users/:id`
pub async fn delete(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    state.user_repository.delete(user_id).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.delete",
        "user",
        user_id,
        serde_json::json!({}),
    )
    .await;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "user deleted".to_string() }))
}

/// `PATCH /api/v1/users/:id/role`
pub async fn update_role(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    let new_role = UserRole::from_str(&body.role).ok_or_else(|| ApiError::BadRequest {
        message: format!("unknown role: {}", body.role),
    })?;
    let user_id = path.into_inner();
    let user = state.user_repository.update_role(user_id, new_role).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.update_role",
        "user",
        user_id,
        serde_json::json!({ "role": body.role }),
    )
    .await;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `PATCH /api/v1/users/:id/status`
pub async fn update_status(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    body.status.parse::<crate::domain::value_objects::UserStatus>().map_err(|_| {
        ApiError::BadRequest { message: format!("unknown status: {}", body.status) }
    })?;
    let user_id = path.into_inner();
    let user = state.user_repository.update_status(user_id, &body.status).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.update_status",
        "user",
        user_id,
        serde_json::json!({ "status": body.status }),
    )
    .await;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `PATCH /api/v1/users/:id/password`. Operator-initiated reset; does not
/// require the caller to present the old password.
pub async fn update_password(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let hashed = state.password_hasher.hash(&body.password)?;
    let user_id = path.into_inner();
    state.user_repository.set_password(user_id, &hashed).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.set_password",
        "user",
        user_id,
        serde_json::json!({}),
    )
    .await;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "password updated".to_string() }))
}

/// `POST /api/v1/users/:id/force-logout`. Operator-initiated displacement,
/// distinct from the user's own `/auth/logout`.
pub async fn force_logout(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    state.auth_service.force_logout(user_id).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "user.force_logout",
        "user",
        user_id,
        serde_json::json!({}),
    )
    .await;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "user logged out".to_string() }))
}
