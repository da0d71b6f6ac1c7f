//! User Storage
//! Credential records in the `users` table.

use crate::auth::models::{User, UserRole};
use crate::db::{Database, StoreError};
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, types::Type, OptionalExtension, Row};
use std::sync::OnceLock;
use tracing::{info, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

/// Hashed once per store and checked on login misses.
const DUMMY_PASSWORD: &str = "medrecords-no-such-user";

/// User storage over the shared SQLite handle
pub struct UserStore {
    db: Database,
    hash_cost: u32,
    dummy_hash: OnceLock<String>,
}

impl UserStore {
    pub fn new(db: Database, hash_cost: u32) -> Self {
        Self {
            db,
            hash_cost,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.query_one("username", username)
    }

    /// Get user by ID
    pub fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, StoreError> {
        self.query_one("id", &id.to_string())
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.query_one("email", email)
    }

    fn query_one(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let conn = self.db.conn();
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let user = conn
            .query_row(&sql, params![value], row_to_user)
            .optional()?;
        Ok(user)
    }

    /// Verify username and password, returning the user on success.
    ///
    /// Unknown usernames and wrong passwords both yield `None`, and both pay
    /// for one bcrypt verification at the store's cost.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>, StoreError> {
        match self.get_user_by_username(username)? {
            Some(user) => {
                if verify(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => {
                verify(password, self.dummy_hash()?)?;
                Ok(None)
            }
        }
    }

    fn dummy_hash(&self) -> Result<&str, StoreError> {
        if let Some(existing) = self.dummy_hash.get() {
            return Ok(existing);
        }
        let fresh = hash(DUMMY_PASSWORD, self.hash_cost)?;
        Ok(self.dummy_hash.get_or_init(|| fresh))
    }

    /// Create a new user
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, StoreError> {
        if self.get_user_by_username(username)?.is_some() {
            return Err(StoreError::Conflict("Username already exists".to_string()));
        }
        if self.get_user_by_email(email)?.is_some() {
            return Err(StoreError::Conflict("Email already exists".to_string()));
        }

        let password_hash = hash(password, self.hash_cost)?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
            ],
        )
        .map_err(|e| StoreError::from_insert(e, "Username or email already exists"))?;

        info!("✅ Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    /// Create a user unless the username is already taken.
    ///
    /// Returns `None` when an account with that username exists.
    pub fn create_user_if_missing(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<Option<User>, StoreError> {
        if self.get_user_by_username(username)?.is_some() {
            info!("User {} already exists", username);
            return Ok(None);
        }
        self.create_user(username, email, password, role).map(Some)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.db.conn();

        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Update email and/or role. Username is immutable.
    pub fn update_user(
        &self,
        user_id: &Uuid,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<User, StoreError> {
        let mut user = self
            .get_user_by_id(user_id)?
            .ok_or_else(|| StoreError::NotFound("User not found".to_string()))?;

        if let Some(email) = email {
            if email != user.email {
                if let Some(other) = self.get_user_by_email(email)? {
                    if other.id != user.id {
                        return Err(StoreError::Conflict("Email already exists".to_string()));
                    }
                }
                user.email = email.to_string();
            }
        }
        if let Some(role) = role {
            user.role = role;
        }

        let conn = self.db.conn();
        conn.execute(
            "UPDATE users SET email = ?1, role = ?2 WHERE id = ?3",
            params![user.email, user.role.as_str(), user.id.to_string()],
        )
        .map_err(|e| StoreError::from_insert(e, "Email already exists"))?;

        info!("✏️  Updated user: {} ({})", user.username, user.role.as_str());
        Ok(user)
    }

    /// Replace the password hash of a user
    pub fn set_password(&self, user_id: &Uuid, password: &str) -> Result<(), StoreError> {
        let password_hash = hash(password, self.hash_cost)?;

        let conn = self.db.conn();
        let rows_affected = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, user_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound("User not found".to_string()));
        }

        info!("🔑 Password changed for user {}", user_id);
        Ok(())
    }

    /// Delete a user by ID
    pub fn delete_user(&self, user_id: &Uuid) -> Result<(), StoreError> {
        let conn = self.db.conn();

        let rows_affected = conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound("User not found".to_string()));
        }

        info!("🗑️  Deleted user: {}", user_id);
        Ok(())
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    let role: String = row.get(4)?;
    let role = role.parse::<UserRole>().map_err(|e| {
        warn!("Stored user {} has invalid role: {}", id, e);
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;

    Ok(User {
        id,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        created_at: row.get(5)?,
    })
}
