//! Request handlers, one module per resource group.

pub mod activity;
pub mod auth;
pub mod billing;
pub mod bundle;
pub mod users;

use actix_web::HttpResponse;
use chrono::Utc;
use uuid::Uuid;

use crate::api::dto::HealthResponse;
use crate::domain::NewAuditLogEntry;
use crate::repository::AuditLogRepository;

/// `GET /healthz`. Excluded from the session-guard stack (§4.9).
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "fleetlock-control".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Journals a privileged-action entry, §4.4/§6. Best-effort like the
/// LoginHistory/SecurityAlert writes in `AuthService` — a journaling
/// failure never unwinds the mutation it's describing.
pub(crate) async fn record_audit_best_effort(
    repo: &AuditLogRepository,
    actor_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    metadata: serde_json::Value,
) {
    let entry = NewAuditLogEntry {
        actor_id: Some(actor_id),
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id: Some(target_id),
        metadata,
    };
    if let Err(err) = repo.create(entry).await {
        tracing::error!(%err, "failed to record audit log entry");
    }
}
