//! # fleetlock-control
//!
//! The control-plane service behind a fleet of desktop clients that share
//! a single authenticated browser session. It owns four tightly-coupled
//! subsystems:
//!
//! - **Auth & single-session engine** (§4.5) — login, refresh, logout, and
//!   the per-request session guard that displaces a user's prior bearer
//!   the moment a newer login wins the single-session slot.
//! - **Shared-bundle distribution** (§4.6) — presigned upload/download
//!   handoff through an injected [`storage::StorageBackend`].
//! - **Security-alert pipeline** (§4.8) — fed by the login pipeline's
//!   device/geolocation checks.
//! - **Billing state machine** (§4.7) — calendar-accurate cycle
//!   arithmetic plus an hourly expiration sweep.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer (api/)                     │
//! │   routes → handlers → dto                                     │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Service Layer (service/)                  │
//! │   AuthService · BundleService · BillingService · Geolocation  │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)               │
//! │   UserRepository · BundleRepository · PaymentRepository       │
//! │   audit::{LoginHistory,SessionActivity,SecurityAlert,...}     │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │              Object Storage (storage/) — S3Backend            │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`]; see
//! that module for the full list. Notably: `DATABASE_URL`,
//! `JWT_ACCESS_SECRET`/`JWT_REFRESH_SECRET`, `OBJECT_STORE_*`,
//! `BOOTSTRAP_OPERATOR_ROOT_EMAIL`/`_PASSWORD`, `GEOLOCATION_PROVIDER_URL`.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use chrono::{Timelike, Utc};
use shared::auth::jwt::JwtService;
use shared::auth::password::PasswordHasher;
use shared::auth::UserRole;
use shared::config::AppConfig;
use shared::redis_client::RedisClient;
use shared::{database, tracing_config};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod api;
mod domain;
mod middleware;
mod repository;
mod service;
mod storage;

use api::routes;
use domain::NewUser;
use middleware::SessionGuard;
use repository::{
    AuditLogRepository, BillingHistoryRepository, BundleRepository, LoginHistoryRepository,
    PaymentRepository, SecurityAlertRepository, SessionActivityRepository, UserRepository,
};
use service::{AuthService, BillingService, BundleService, GeolocationService};
use storage::S3Backend;

/// Shared application state injected into every request handler.
///
/// Repositories hold their own `PgPool` clone so handlers that bypass a
/// service (read-only audit views) can still reach the database without
/// threading the pool through every call site.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub bundle_service: BundleService,
    pub billing_service: BillingService,
    pub user_repository: UserRepository,
    pub payment_repository: PaymentRepository,
    pub login_history_repository: LoginHistoryRepository,
    pub security_alert_repository: SecurityAlertRepository,
    pub billing_history_repository: BillingHistoryRepository,
    pub audit_log_repository: AuditLogRepository,
    pub password_hasher: PasswordHasher,
}

/// Seeds the bootstrap operator-root account if it doesn't already exist.
/// Runs once at startup; idempotent across restarts (§6's bootstrap
/// configuration is meant to survive redeploys without re-provisioning).
async fn seed_bootstrap_operator(
    users: &UserRepository,
    hasher: &PasswordHasher,
    config: &shared::config::BootstrapConfig,
) {
    match users.find_by_email(&config.operator_root_email).await {
        Ok(Some(_)) => info!("bootstrap operator-root already present"),
        Ok(None) => {
            let hashed_password = match hasher.hash(&config.operator_root_password) {
                Ok(hashed) => hashed,
                Err(err) => {
                    error!(%err, "failed to hash bootstrap operator-root password");
                    return;
                }
            };
            match users
                .create(NewUser {
                    email: config.operator_root_email.clone(),
                    hashed_password,
                    role: UserRole::OperatorRoot,
                })
                .await
            {
                Ok(_) => info!(email = %config.operator_root_email, "seeded bootstrap operator-root"),
                Err(err) => error!(%err, "failed to seed bootstrap operator-root"),
            }
        }
        Err(err) => error!(%err, "failed to look up bootstrap operator-root"),
    }
}

/// Seconds remaining until the next wall-clock hour boundary (minute 0,
/// second 0). `seconds_into_hour` is always 0..=3599, so this is always a
/// full hour when sitting exactly on the boundary, never zero.
fn duration_until_next_hour(now: chrono::DateTime<Utc>) -> Duration {
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    Duration::from_secs(3600 - seconds_into_hour)
}

async fn run_billing_sweep_once(billing_service: &BillingService) {
    match billing_service.run_sweep().await {
        Ok(summary) => info!(disabled = summary.users_disabled, "billing sweep complete"),
        Err(err) => error!(%err, "billing sweep failed"),
    }
}

/// Runs the billing sweep per §4.7.5 and §5's single-in-process-scheduler
/// rule: once 5s after boot (catch-up for downtime), then realigned to
/// the top of every hour. `interval_at` is anchored to the next hour
/// boundary rather than `interval`'s "fire immediately" default, so the
/// catch-up run above and the first scheduled run never collide.
fn spawn_billing_sweeper(billing_service: BillingService) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        run_billing_sweep_once(&billing_service).await;

        let until_next_hour = duration_until_next_hour(Utc::now());
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + until_next_hour, Duration::from_secs(3600));
        loop {
            interval.tick().await;
            run_billing_sweep_once(&billing_service).await;
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "starting fleetlock-control"
    );

    let db_pool = database::create_pool(&config.database)
        .await
        .expect("failed to create database pool");

    let redis_client = RedisClient::new(&config.redis)
        .await
        .expect("failed to connect to redis");

    let jwt_service = JwtService::new(config.jwt.clone());
    let password_hasher = PasswordHasher::new();

    let user_repository = UserRepository::new(db_pool.clone());
    let bundle_repository = BundleRepository::new(db_pool.clone());
    let payment_repository = PaymentRepository::new(db_pool.clone());
    let login_history_repository = LoginHistoryRepository::new(db_pool.clone());
    let session_activity_repository = SessionActivityRepository::new(db_pool.clone());
    let security_alert_repository = SecurityAlertRepository::new(db_pool.clone());
    let billing_history_repository = BillingHistoryRepository::new(db_pool.clone());
    let audit_log_repository = AuditLogRepository::new(db_pool.clone());

    let geolocation_service = GeolocationService::new(config.geolocation.clone(), redis_client.clone());
    let billing_service = BillingService::new(
        user_repository.clone(),
        payment_repository.clone(),
        billing_history_repository.clone(),
    );

    let storage_backend: Arc<dyn storage::StorageBackend> = Arc::new(S3Backend::new(&config.object_store));
    let bundle_service = BundleService::new(bundle_repository, storage_backend, config.object_store.clone());

    let auth_service = AuthService::new(
        db_pool.clone(),
        user_repository.clone(),
        session_activity_repository.clone(),
        login_history_repository.clone(),
        security_alert_repository.clone(),
        billing_service.clone(),
        geolocation_service,
        redis_client.clone(),
        jwt_service.clone(),
        password_hasher.clone(),
    );

    seed_bootstrap_operator(&user_repository, &password_hasher, &config.bootstrap).await;
    spawn_billing_sweeper(billing_service.clone());

    let app_state = web::Data::new(AppState {
        auth_service,
        bundle_service,
        billing_service,
        user_repository: user_repository.clone(),
        payment_repository,
        login_history_repository,
        security_alert_repository,
        billing_history_repository,
        audit_log_repository,
        password_hasher,
    });

    let session_guard = SessionGuard::new(jwt_service, user_repository, session_activity_repository);

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    info!("server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .service(
                web::scope("/api/v1")
                    .configure(routes::configure_public)
                    .service(
                        web::scope("")
                            .wrap(session_guard.clone())
                            .configure(routes::configure_authenticated),
                    ),
            )
            .route("/healthz", web::get().to(api::handlers::health_check))
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
