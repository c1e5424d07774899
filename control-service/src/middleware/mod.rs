//! DB-aware request authentication, §4.5.4. Complements the generic pieces
//! in `shared::auth::middleware` with the per-request work that needs a
//! database handle.

pub mod session_guard;

pub use session_guard::SessionGuard;
