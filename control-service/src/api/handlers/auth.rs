//! `/api/v1/auth/*`, §4.5 + §6.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::auth::middleware::AuthenticatedUser;
use shared::errors::ApiError;
use shared::validation;

use crate::api::dto::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
    SessionStatusResponse, TokenPairDto,
};
use crate::service::auth_service::LoginInput;
use crate::AppState;

/// `POST /api/v1/auth/login`
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let outcome = state
        .auth_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
            mac_address: body.mac_address,
            device_metadata: body.device_metadata,
            ip,
            user_agent,
        })
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: outcome.profile,
        tokens: TokenPairDto {
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
            expires_in: outcome.tokens.expires_in,
            refresh_expires_in: outcome.tokens.refresh_expires_in,
        },
    }))
}

/// `POST /api/v1/auth/refresh`
pub async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let tokens = state.auth_service.refresh(&body.refresh_token).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        tokens: TokenPairDto {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            refresh_expires_in: tokens.refresh_expires_in,
        },
    }))
}

/// `GET /api/v1/auth/me`
pub async fn me(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .user_repository
        .find_by_id(user.user_id)
        .await?
        .map(|u| crate::domain::UserProfile::from(&u))
        .ok_or(ApiError::InvalidToken)?;
    Ok(HttpResponse::Ok().json(profile))
}

/// `GET /api/v1/auth/session-status`. The middleware having let the request
/// through at all is itself the validity proof, per §4.5.5.
pub async fn session_status(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(SessionStatusResponse { valid: true, user_id: Some(user.user_id) })
}

/// `POST /api/v1/auth/logout`
pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    state.auth_service.logout(user.user_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "logged out".to_string() }))
}
