//! Authentication Middleware
//! Route guard that resolves the bearer token into a user, optionally
//! requires a role, and hands the user to the handler via request extensions.

use crate::auth::{error::AuthError, models::User, models::UserRole, service::Authenticator};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Guard configuration attached to a route with `middleware::from_fn_with_state`.
#[derive(Clone)]
pub struct Guard {
    authenticator: Arc<Authenticator>,
    required_role: Option<UserRole>,
}

impl Guard {
    /// Any authenticated user passes.
    pub fn authenticated(authenticator: Arc<Authenticator>) -> Self {
        Self {
            authenticator,
            required_role: None,
        }
    }

    /// Only users holding `role` pass.
    pub fn require(authenticator: Arc<Authenticator>, role: UserRole) -> Self {
        Self {
            authenticator,
            required_role: Some(role),
        }
    }

    /// Resolve the caller from request headers.
    pub fn check(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let user = self.authenticator.verify(token)?;

        if let Some(required) = self.required_role {
            if user.role != required {
                debug!(
                    "{} ({}) denied: requires {}",
                    user.username, user.role, required
                );
                return Err(AuthError::Forbidden);
            }
        }

        Ok(user)
    }
}

/// Extract `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();

    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Auth middleware that validates JWT tokens
pub async fn auth_middleware(
    State(guard): State<Guard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = guard.check(req.headers()).map_err(|e| {
        debug!("Rejected {} {}: {}", req.method(), req.uri().path(), e.kind());
        e
    })?;

    // Handlers read the caller with `Extension<User>`
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
