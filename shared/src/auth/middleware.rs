//! # Authentication Primitives for Actix-web
//!
//! The generic pieces of request authentication that don't depend on a
//! database: the authenticated-user extractor, the role hierarchy, and
//! route guards built on it. The heavier per-request work the service
//! contract requires — loading the user row, comparing the bearer against
//! `currentSessionToken`, touching `SessionActivity.lastActivityAt` — needs
//! a database handle and lives in the service's own middleware, which
//! authenticates the request and inserts an [`AuthenticatedUser`] into the
//! request extensions for this extractor to pick up.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────┐   ┌────────────────────────┐   ┌──────────────┐
//! │ Request │──►│ service session-guard  │──►│   Handler    │
//! └─────────┘   │ (verify + DB revalidate)│   │(AuthenticatedUser)│
//!               └────────────┬────────────┘   └──────────────┘
//!                             │ inserts AuthenticatedUser into extensions
//! ```
//!
//! ## Role hierarchy
//!
//! ```text
//! operator-root ──► operator ──► support ──► user
//! ```
//! Each role can do everything the roles to its right can do.

use crate::auth::jwt::Claims;
use crate::errors::ApiError;
use actix_web::{Error, HttpMessage};
use uuid::Uuid;

/// The caller identified by a validated, still-current bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

/// Role tiers, most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserRole {
    User,
    Support,
    Operator,
    OperatorRoot,
}

impl UserRole {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "support" => Some(Self::Support),
            "operator" => Some(Self::Operator),
            "operator-root" | "operator_root" => Some(Self::OperatorRoot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Support => "support",
            Self::Operator => "operator",
            Self::OperatorRoot => "operator-root",
        }
    }

    /// `self` has at least `required`'s privilege: operator-root > operator
    /// > support > user, derived from the enum's declaration order.
    pub fn has_permission(&self, required: Self) -> bool {
        *self >= required
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            // An unrecognized role claim is treated as the least privilege
            // rather than rejected outright; the per-request DB revalidation
            // that follows re-derives the role from the user row anyway.
            role: UserRole::from_str(&claims.role).unwrap_or(UserRole::User),
        }
    }
}

impl actix_web::FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::MissingAuth.into());

        std::future::ready(result)
    }
}

/// Route guards for `actix_web::guard`-style role checks, reading the
/// `AuthenticatedUser` the session-guard middleware already attached.
pub struct RequireRole;

impl RequireRole {
    pub fn user(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::User)
    }

    pub fn support(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::Support)
    }

    pub fn operator(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::Operator)
    }

    pub fn operator_root(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::OperatorRoot)
    }

    fn check_role(req: &actix_web::guard::GuardContext, required: UserRole) -> bool {
        req.req_data()
            .get::<AuthenticatedUser>()
            .map(|user| user.role.has_permission(required))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive_and_accepts_both_separators() {
        assert_eq!(UserRole::from_str("user"), Some(UserRole::User));
        assert_eq!(UserRole::from_str("SUPPORT"), Some(UserRole::Support));
        assert_eq!(UserRole::from_str("Operator"), Some(UserRole::Operator));
        assert_eq!(UserRole::from_str("operator-root"), Some(UserRole::OperatorRoot));
        assert_eq!(UserRole::from_str("operator_root"), Some(UserRole::OperatorRoot));
        assert_eq!(UserRole::from_str("nonsense"), None);
    }

    #[test]
    fn operator_root_has_every_permission() {
        assert!(UserRole::OperatorRoot.has_permission(UserRole::OperatorRoot));
        assert!(UserRole::OperatorRoot.has_permission(UserRole::Operator));
        assert!(UserRole::OperatorRoot.has_permission(UserRole::Support));
        assert!(UserRole::OperatorRoot.has_permission(UserRole::User));
    }

    #[test]
    fn support_cannot_act_as_operator() {
        assert!(!UserRole::Support.has_permission(UserRole::Operator));
        assert!(!UserRole::Support.has_permission(UserRole::OperatorRoot));
        assert!(UserRole::Support.has_permission(UserRole::Support));
        assert!(UserRole::Support.has_permission(UserRole::User));
    }

    #[test]
    fn user_has_only_user_permission() {
        assert!(UserRole::User.has_permission(UserRole::User));
        assert!(!UserRole::User.has_permission(UserRole::Support));
    }

    #[test]
    fn unrecognized_claim_role_degrades_to_least_privilege() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "unknown_role".to_string(),
            iss: "test".to_string(),
            aud: "test".to_string(),
            exp: 0,
            iat: 0,
            jti: Uuid::new_v4(),
            token_type: crate::auth::jwt::TokenType::Access,
        };

        let user = AuthenticatedUser::from(claims);
        assert_eq!(user.role, UserRole::User);
    }
}
