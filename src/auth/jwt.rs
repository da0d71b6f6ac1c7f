//! JWT Token Handler
//! Generate and validate HS256 tokens with the process-wide secret.

use crate::auth::error::AuthError;
use crate::auth::models::{Claims, User};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: 24, // 24-hour tokens by default
        }
    }

    pub fn with_expiration_hours(mut self, hours: i64) -> Self {
        self.expiration_hours = hours;
        self
    }

    pub fn expiration_hours(&self) -> i64 {
        self.expiration_hours
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &User) -> Result<(String, usize)> {
        if self.expiration_hours <= 0 {
            bail!("Token lifetime must be positive, got {}h", self.expiration_hours);
        }
        let lifetime = chrono::Duration::try_hours(self.expiration_hours)
            .with_context(|| format!("Token lifetime out of range: {}h", self.expiration_hours))?;
        let expiration = Utc::now()
            .checked_add_signed(lifetime)
            .context("Token expiry out of range")?
            .timestamp();

        let expires_in = self
            .expiration_hours
            .checked_mul(3600)
            .context("Token lifetime out of range")?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp: usize::try_from(expiration).context("Token expiry out of range")?,
        };

        debug!(
            "Generating JWT for user {} ({}), expires in {}h",
            user.username, user.id, self.expiration_hours
        );

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")?;

        Ok((token, usize::try_from(expires_in).context("Token lifetime out of range")?))
    }

    /// Validate a JWT token and extract claims.
    ///
    /// The signature is checked before the expiry, so a forged token is
    /// reported as `InvalidSignature` even when it is also past `exp`.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expire at exactly `exp`
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::MalformedToken,
        })?;

        debug!("Validated JWT for user {}", decoded.claims.username);

        Ok(decoded.claims)
    }
}
