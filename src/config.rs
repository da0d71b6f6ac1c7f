//! Runtime configuration read from the environment.

use anyhow::{bail, Context, Result};
use std::fmt;

pub const DEFAULT_DATABASE_PATH: &str = "./medrecords.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 8760;

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_path: String,
    pub bind_addr: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // No fallback secret, ever
        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ => bail!("JWT_SECRET must be set to a non-empty value"),
        };

        let database_path =
            var("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let token_ttl_hours = match var("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid TOKEN_TTL_HOURS: {}", raw))?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            bail!(
                "TOKEN_TTL_HOURS must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                token_ttl_hours
            );
        }

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid BCRYPT_COST: {}", raw))?,
            None => bcrypt::DEFAULT_COST,
        };
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", bcrypt_cost);
        }

        Ok(Self {
            jwt_secret,
            database_path,
            bind_addr,
            token_ttl_hours,
            bcrypt_cost,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("database_path", &self.database_path)
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}
