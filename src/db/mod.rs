//! SQLite persistence shared by the user, patient and appointment stores.
//!
//! A single `Database` handle is opened at startup and cloned into every
//! store. Patients and appointments are kept as JSON documents next to the
//! few columns that are queried directly.

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Shared connection handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize_schema()?;
        debug!("Opened database at {}", path.as_ref().display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize_schema()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('admin', 'doctor')),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                doctor_id TEXT,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_patients_doctor ON patients(doctor_id);

            CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                doctor_id TEXT NOT NULL,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_id);
            CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
            "#,
        )?;

        Ok(())
    }
}

/// Errors from the stores.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Serialization(serde_json::Error),
    Hash(bcrypt::BcryptError),
    Conflict(String),
    NotFound(String),
}

impl StoreError {
    /// Turn a UNIQUE violation into `Conflict`, keep anything else as SQLite.
    pub(crate) fn from_insert(e: rusqlite::Error, conflict: &str) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                Self::Conflict(conflict.to_string())
            }
            _ => Self::Sqlite(e),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Hash(e) => write!(f, "Password hashing error: {}", e),
            Self::Conflict(what) => write!(f, "{}", what),
            Self::NotFound(what) => write!(f, "{}", what),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Hash(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_schema_is_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();

        // Opening twice must not fail on existing tables
        let first = Database::new(temp_file.path()).unwrap();
        drop(first);
        let second = Database::new(temp_file.path()).unwrap();

        let tables: i64 = second
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'patients', 'appointments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_role_check_constraint() {
        let db = Database::in_memory().unwrap();
        let result = db.conn().execute(
            "INSERT INTO users (id, username, email, password_hash, role, created_at)
             VALUES ('x', 'nurse1', 'n@example.com', 'h', 'nurse', 'now')",
            [],
        );
        match result.unwrap_err() {
            rusqlite::Error::SqliteFailure(err, _) => {
                assert_eq!(err.code, ErrorCode::ConstraintViolation)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
