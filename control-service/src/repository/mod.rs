//! Storage-layer access, one module per aggregate.

pub mod audit;
pub mod bundle_repository;
pub mod payment_repository;
pub mod user_repository;

pub use audit::{
    AuditLogRepository, BillingHistoryRepository, LoginHistoryRepository,
    SecurityAlertRepository, SessionActivityRepository,
};
pub use bundle_repository::BundleRepository;
pub use payment_repository::PaymentRepository;
pub use user_repository::UserRepository;
