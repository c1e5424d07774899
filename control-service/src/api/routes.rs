//! Route table, §6.
//!
//! ```text
//! /healthz                                      GET    → health_check (no guard)
//! /api/v1/auth/
//!   ├── login                                   POST   → auth::login        (public)
//!   ├── refresh                                 POST   → auth::refresh      (public)
//!   ├── me                                      GET    → auth::me           (session)
//!   ├── session-status                          GET    → auth::session_status (session)
//!   └── logout                                  POST   → auth::logout      (session)
//! /api/v1/users/
//!   ├── (GET|POST)                                     → users::list/create        (operator)
//!   ├── :id (GET|PATCH|DELETE)                         → users::get/update/delete  (operator)
//!   ├── :id/role (PATCH)                               → users::update_role        (operator)
//!   ├── :id/status (PATCH)                             → users::update_status      (operator)
//!   ├── :id/password (PATCH)                           → users::update_password    (operator)
//!   ├── :id/force-logout (POST)                        → users::force_logout       (operator)
//!   ├── :id/login-history (GET)                        → activity::login_history   (operator)
//!   ├── :id/alerts (GET)                               → activity::list_alerts     (operator)
//!   └── :id/billing/*                                  → billing::*                (operator)
//! /api/v1/sessions/
//!   ├── my-sessions, shared-stats (GET)                → bundle::my_sessions/shared_stats (session)
//!   ├── :id/request-upload, complete-upload (POST)     → bundle::* (operator)
//!   ├── :id/request-download (POST)                    → bundle::request_download (session)
//!   ├── :id/mark-ready (POST)                          → bundle::mark_ready (operator-root)
//!   ├── :id/domain (POST)                              → bundle::assign_domain (operator-root)
//!   ├── :id/proxy (POST)                               → bundle::assign_proxy (operator-root)
//!   ├── :id/report-status (POST)                       → bundle::report_status (operator)
//!   └── :id/events (POST)                               → bundle::events (session)
//! /api/v1/alerts/{unread-count,:id/read,:id/dismiss}    → activity::* (operator)
//! ```
//!
//! Everything except `/auth/login`, `/auth/refresh`, and `/healthz` sits
//! behind [`crate::middleware::SessionGuard`], per §4.9. The guard wraps a
//! whole scope in `main.rs`; `configure_authenticated` below only adds
//! role guards on top of whatever auth that enclosing scope already
//! enforces, and `configure_public` wires the two endpoints the guard
//! must never touch. Role guards use `actix_web::guard::fn_guard` over
//! [`shared::auth::middleware::RequireRole`], matching the teacher's own
//! `guard = "RequireRole::admin"` convention, adapted from attribute-macro
//! form to `web::ServiceConfig` form since these handlers are plain
//! functions, not `#[get(...)]`-annotated.

use actix_web::{guard, web};

use super::handlers::{activity, auth, billing, bundle, users};
use shared::auth::middleware::RequireRole;

/// `/auth/login` and `/auth/refresh` — the two endpoints the session
/// guard must never wrap, since neither has a session yet to validate.
pub fn configure_public(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(auth::login))
            .route("/refresh", web::post().to(auth::refresh)),
    );
}

/// Everything that requires a valid, non-displaced session. Mounted under
/// a scope already wrapped with [`crate::middleware::SessionGuard`].
pub fn configure_authenticated(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(auth::me))
            .route("/session-status", web::get().to(auth::session_status))
            .route("/logout", web::post().to(auth::logout)),
    )
    .service(
        web::scope("/users")
            .guard(guard::fn_guard(RequireRole::operator))
            .route("", web::get().to(users::list))
            .route("", web::post().to(users::create))
            .route("/{id}", web::get().to(users::get))
            .route("/{id}", web::patch().to(users::update))
            .route("/{id}", web::delete().to(users::delete))
            .route("/{id}/role", web::patch().to(users::update_role))
            .route("/{id}/status", web::patch().to(users::update_status))
            .route("/{id}/password", web::patch().to(users::update_password))
            .route("/{id}/force-logout", web::post().to(users::force_logout))
            .route("/{id}/login-history", web::get().to(activity::login_history))
            .route("/{id}/alerts", web::get().to(activity::list_alerts))
            .route("/{id}/billing/status", web::get().to(billing::status))
            .route("/{id}/billing/start-cycle", web::post().to(billing::start_cycle))
            .route("/{id}/billing/payments", web::post().to(billing::add_payment))
            .route("/{id}/billing/payments", web::get().to(billing::list_payments))
            .route("/{id}/billing/trial", web::post().to(billing::set_trial))
            .route("/{id}/billing/history", web::get().to(billing::history)),
    )
    .service(
        web::scope("/sessions")
            .route("/my-sessions", web::get().to(bundle::my_sessions))
            .route("/shared-stats", web::get().to(bundle::shared_stats))
            .route("/{id}/request-download", web::post().to(bundle::request_download))
            .route("/{id}/events", web::post().to(bundle::events))
            .service(
                web::scope("")
                    .guard(guard::fn_guard(RequireRole::operator))
                    .route("/{id}/request-upload", web::post().to(bundle::request_upload))
                    .route("/{id}/complete-upload", web::post().to(bundle::complete_upload))
                    .route("/{id}/report-status", web::post().to(bundle::report_status)),
            )
            .service(
                web::scope("")
                    .guard(guard::fn_guard(RequireRole::operator_root))
                    .route("/{id}/mark-ready", web::post().to(bundle::mark_ready))
                    .route("/{id}/domain", web::post().to(bundle::assign_domain))
                    .route("/{id}/proxy", web::post().to(bundle::assign_proxy)),
            ),
    )
    .service(
        web::scope("/alerts")
            .guard(guard::fn_guard(RequireRole::operator))
            .route("/unread-count", web::get().to(activity::unread_count))
            .route("/{alertId}/read", web::patch().to(activity::mark_alert_read))
            .route("/{alertId}/dismiss", web::post().to(activity::dismiss_alert)),
    );
}
