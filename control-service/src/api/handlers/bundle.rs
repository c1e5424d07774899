//! `/api/v1/sessions/*`, §4.6. Named `sessions` in the HTTP surface for
//! historical reasons even though it mediates the single shared bundle, not
//! per-user sessions — see `spec.md` §6.

use actix_web::{web, HttpResponse};
use shared::auth::middleware::AuthenticatedUser;
use shared::errors::ApiError;
use shared::validation;
use uuid::Uuid;

use crate::api::dto::{
    AssignDomainRequest, AssignProxyRequest, BundleEventRequest, BundleResponse,
    CompleteUploadRequest, DownloadUrlResponse, MessageResponse, ReportStatusRequest,
    UploadUrlResponse,
};
use crate::AppState;

/// `GET /api/v1/sessions/my-sessions`
pub async fn my_sessions(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let bundle = state.bundle_service.get_or_create().await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `GET /api/v1/sessions/shared-stats`
pub async fn shared_stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let bundle = state.bundle_service.get_or_create().await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/request-upload` — role ≥ operator.
pub async fn request_upload(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let bundle_id = path.into_inner();
    let upload = state.bundle_service.request_upload(bundle_id).await?;
    Ok(HttpResponse::Ok().json(UploadUrlResponse {
        url: upload.url,
        bundle_key: upload.key,
        expires_in_seconds: upload.expires_in_seconds,
    }))
}

/// `POST /api/v1/sessions/:id/complete-upload`
pub async fn complete_upload(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CompleteUploadRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let bundle = state.bundle_service.complete_upload(path.into_inner(), &body.checksum).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/request-download` — any authenticated active
/// user.
pub async fn request_download(
    _user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let download = state.bundle_service.request_download(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DownloadUrlResponse {
        url: download.url,
        bundle_key: download.key,
        expires_in_seconds: download.expires_in_seconds,
    }))
}

/// `POST /api/v1/sessions/:id/mark-ready` — operator-root only.
pub async fn mark_ready(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let bundle = state.bundle_service.mark_ready(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/report-status` — operator-reported terminal
/// state (`auth_error`/`proxy_error`), §4.6's lifecycle table.
pub async fn report_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ReportStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let bundle = state.bundle_service.report_status(path.into_inner(), &body.status).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/domain` — operator-root only. Repoints the
/// bundle at a different catalog `Domain`, or clears it with `null`.
pub async fn assign_domain(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AssignDomainRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let bundle = state.bundle_service.assign_domain(path.into_inner(), body.domain_id).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/proxy` — operator-root only. Repoints the
/// bundle at a different catalog `Proxy`, or clears it with `null`.
pub async fn assign_proxy(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AssignProxyRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let bundle = state.bundle_service.assign_proxy(path.into_inner(), body.proxy_id).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

/// `POST /api/v1/sessions/:id/events` — client-reported status, logged only,
/// no state transition.
pub async fn events(
    body: web::Json<BundleEventRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    tracing::info!(level = %body.level, message = %body.message, context = ?body.context, "bundle client event");
    Ok(HttpResponse::Ok().json(MessageResponse { message: "recorded".to_string() }))
}
