//! Token Authenticator
//! Issues tokens for valid credentials and resolves tokens back into live
//! user records.

use crate::auth::error::AuthError;
use crate::auth::jwt::JwtHandler;
use crate::auth::models::User;
use crate::auth::user_store::UserStore;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// A freshly signed token together with the user it was issued for.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: usize,
    pub user: User,
}

pub struct Authenticator {
    users: Arc<UserStore>,
    jwt: JwtHandler,
}

impl Authenticator {
    pub fn new(users: Arc<UserStore>, jwt: JwtHandler) -> Self {
        Self { users, jwt }
    }

    /// Check credentials and sign a token for the matching user.
    pub fn issue(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = self
            .users
            .verify_password(username, password)
            .map_err(|e| {
                error!("Credential lookup failed for {}: {}", username, e);
                AuthError::Internal
            })?
            .ok_or_else(|| {
                warn!("❌ Failed login attempt: {}", username);
                AuthError::InvalidCredentials
            })?;

        let (token, expires_in) = self.jwt.generate_token(&user).map_err(|e| {
            error!("Token generation failed for {}: {:#}", user.username, e);
            AuthError::Internal
        })?;

        Ok(IssuedToken {
            token,
            expires_in,
            user,
        })
    }

    /// Verify a token and load the current record of its subject.
    ///
    /// The returned user carries the role stored now, not the one embedded
    /// in the token.
    pub fn verify(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.jwt.validate_token(token)?;

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            warn!("Token subject is not a user id: {}", claims.sub);
            return Err(AuthError::UnknownSubject);
        };

        let user = self
            .users
            .get_user_by_id(&user_id)
            .map_err(|e| {
                error!("Subject lookup failed for {}: {}", user_id, e);
                AuthError::Internal
            })?
            .ok_or_else(|| {
                debug!("Token subject {} no longer exists", user_id);
                AuthError::UnknownSubject
            })?;

        if user.role != claims.role {
            debug!(
                "Role of {} changed since issuance ({} -> {})",
                user.username, claims.role, user.role
            );
        }

        Ok(user)
    }
}
