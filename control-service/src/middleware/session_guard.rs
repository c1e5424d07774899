//! §4.5.4: per-request session validation. Runs on every authenticated
//! route ahead of the handler — verifies the bearer, reloads the user row,
//! and rejects with `DisplacedSession` the instant the bearer no longer
//! matches `User.currentSessionToken` (i.e. another login has since won
//! the single-session slot). A matched request's `lastActivityAt` is
//! touched in the background after the handler runs, so a slow heartbeat
//! write never adds latency to the response.

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use shared::auth::jwt::JwtService;
use shared::auth::middleware::{AuthenticatedUser, UserRole};
use shared::errors::ApiError;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::warn;

use crate::repository::{SessionActivityRepository, UserRepository};

#[derive(Clone)]
pub struct SessionGuard {
    jwt: JwtService,
    users: UserRepository,
    sessions: SessionActivityRepository,
}

impl SessionGuard {
    pub fn new(jwt: JwtService, users: UserRepository, sessions: SessionActivityRepository) -> Self {
        Self { jwt, users, sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
            users: self.users.clone(),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
    jwt: JwtService,
    users: UserRepository,
    sessions: SessionActivityRepository,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt = self.jwt.clone();
        let users = self.users.clone();
        let sessions = self.sessions.clone();

        let auth_header = req
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        Box::pin(async move {
            let token = match auth_header.as_deref().map(JwtService::extract_from_header) {
                Some(Ok(token)) => token.to_string(),
                Some(Err(err)) => return Err(err.into()),
                None => return Err(ApiError::MissingAuth.into()),
            };

            let claims = match jwt.validate_access_token(&token) {
                Ok(claims) => claims,
                Err(err) => return Err(err.into()),
            };

            let user = match users.find_by_id(claims.sub).await {
                Ok(Some(user)) => user,
                Ok(None) => return Err(ApiError::InvalidToken.into()),
                Err(err) => return Err(err.into()),
            };

            if !user.is_active() {
                return Err(ApiError::InactiveAccount.into());
            }

            match user.current_session_token.as_deref() {
                Some(current) if current == token => {}
                _ => return Err(ApiError::DisplacedSession.into()),
            }

            req.extensions_mut().insert(AuthenticatedUser {
                user_id: user.user_id,
                email: user.email.clone(),
                role: UserRole::from_str(&user.role).unwrap_or(UserRole::User),
            });

            let response = service.call(req).await?;

            // Heartbeat is best-effort and never blocks the response.
            tokio::spawn(async move {
                match sessions.find_active_by_token(&token).await {
                    Ok(Some(activity)) => {
                        if let Err(err) = sessions.touch_last_activity(activity.session_activity_id).await {
                            warn!(%err, "failed to touch session activity heartbeat");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!(%err, "failed to look up session activity for heartbeat"),
                }
            });

            Ok(response)
        })
    }
}
