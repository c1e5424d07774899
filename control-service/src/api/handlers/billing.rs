//! `/api/v1/users/:id/billing/*`, §4.7.

use actix_web::{web, HttpResponse};
use shared::auth::middleware::AuthenticatedUser;
use shared::errors::ApiError;
use shared::validation;
use uuid::Uuid;

use crate::api::dto::{AddPaymentRequest, BillingStatusResponse, SetTrialRequest, StartCycleRequest};
use crate::api::handlers::record_audit_best_effort;
use crate::domain::value_objects::BillingCycle;
use crate::domain::UserProfile;
use crate::AppState;

/// `GET /api/v1/users/:id/billing/status`
pub async fn status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;
    let status = state.billing_service.status_for(&user);
    Ok(HttpResponse::Ok().json(BillingStatusResponse { status }))
}

/// `POST /api/v1/users/:id/billing/start-cycle`
pub async fn start_cycle(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<StartCycleRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let cycle = parse_cycle(&body.cycle)?;
    let user_id = path.into_inner();

    let user = state.billing_service.start_cycle(user_id, cycle, body.start_date).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "billing.start_cycle",
        "user",
        user_id,
        serde_json::json!({ "cycle": body.cycle }),
    )
    .await;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `POST /api/v1/users/:id/billing/payments`
pub async fn add_payment(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddPaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let cycle = parse_cycle(&body.cycle)?;

    let user_id = path.into_inner();
    let (user, payment) = state
        .billing_service
        .add_payment(user_id, cycle, body.amount, body.memo, actor.user_id)
        .await?;

    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "billing.add_payment",
        "user",
        user_id,
        serde_json::json!({ "cycle": body.cycle, "amount": payment.amount }),
    )
    .await;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "user": UserProfile::from(&user),
        "payment": payment,
    })))
}

/// `GET /api/v1/users/:id/billing/payments`
pub async fn list_payments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let payments = state.payment_repository.list_for_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// `POST /api/v1/users/:id/billing/trial`
pub async fn set_trial(
    actor: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SetTrialRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let user_id = path.into_inner();
    let user = state.billing_service.set_trial(user_id, body.hours).await?;
    record_audit_best_effort(
        &state.audit_log_repository,
        actor.user_id,
        "billing.set_trial",
        "user",
        user_id,
        serde_json::json!({ "hours": body.hours }),
    )
    .await;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// `GET /api/v1/users/:id/billing/history`
pub async fn history(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entries = state.billing_history_repository.list_for_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

fn parse_cycle(raw: &str) -> Result<BillingCycle, ApiError> {
    raw.parse().map_err(|_| ApiError::BadRequest { message: format!("unknown billing cycle: {raw}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cycle_accepts_every_known_variant() {
        assert_eq!(parse_cycle("daily").unwrap(), BillingCycle::Daily);
        assert_eq!(parse_cycle("weekly").unwrap(), BillingCycle::Weekly);
        assert_eq!(parse_cycle("monthly").unwrap(), BillingCycle::Monthly);
        assert_eq!(parse_cycle("three_months").unwrap(), BillingCycle::ThreeMonths);
        assert_eq!(parse_cycle("half_year").unwrap(), BillingCycle::HalfYear);
        assert_eq!(parse_cycle("yearly").unwrap(), BillingCycle::Yearly);
    }

    #[test]
    fn parse_cycle_rejects_unknown_input() {
        let err = parse_cycle("fortnightly").unwrap_err();
        match err {
            ApiError::BadRequest { message } => assert!(message.contains("fortnightly")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }
}
