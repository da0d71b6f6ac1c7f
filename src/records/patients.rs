//! Patient records.

use crate::db::{Database, StoreError};
use crate::records::{strip_server_fields, Scope};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

/// Fields a client must supply when adding a patient.
pub const REQUIRED_FIELDS: &[&str] = &["name", "email", "phone", "address", "date_of_birth"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Patient as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct PatientStore {
    db: Database,
}

impl PatientStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, new: NewPatient) -> Result<Patient, StoreError> {
        let mut extra = new.extra;
        strip_server_fields(&mut extra, &[]);

        let patient = Patient {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            date_of_birth: new.date_of_birth,
            doctor_id: new.doctor_id,
            created_at: Utc::now().to_rfc3339(),
            extra,
        };

        if self.email_taken(&patient.email, None)? {
            return Err(StoreError::Conflict(
                "Patient with this email already exists".to_string(),
            ));
        }

        let document = serde_json::to_string(&patient)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO patients (id, email, doctor_id, document, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                patient.id,
                patient.email,
                patient.doctor_id,
                document,
                patient.created_at,
            ],
        )
        .map_err(|e| StoreError::from_insert(e, "Patient with this email already exists"))?;

        info!("🩺 Added patient {} ({})", patient.id, patient.name);
        Ok(patient)
    }

    pub fn list(&self, scope: &Scope) -> Result<Vec<Patient>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT document FROM patients
             WHERE (?1 IS NULL OR doctor_id = ?1)
             ORDER BY created_at",
        )?;

        let documents = stmt
            .query_map(params![scope.doctor_id()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    pub fn get(&self, id: &str, scope: &Scope) -> Result<Option<Patient>, StoreError> {
        let conn = self.db.conn();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM patients
                 WHERE id = ?1 AND (?2 IS NULL OR doctor_id = ?2)",
                params![id, scope.doctor_id()],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    /// Overwrite a stored patient with `patient`.
    pub fn replace(&self, patient: &Patient) -> Result<(), StoreError> {
        if self.email_taken(&patient.email, Some(&patient.id))? {
            return Err(StoreError::Conflict(
                "Another patient with this email already exists".to_string(),
            ));
        }

        let document = serde_json::to_string(patient)?;
        let conn = self.db.conn();
        let rows_affected = conn
            .execute(
                "UPDATE patients SET email = ?1, doctor_id = ?2, document = ?3 WHERE id = ?4",
                params![patient.email, patient.doctor_id, document, patient.id],
            )
            .map_err(|e| {
                StoreError::from_insert(e, "Another patient with this email already exists")
            })?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound("Patient not found".to_string()));
        }
        Ok(())
    }

    /// Delete a patient that has no appointments.
    pub fn delete(&self, id: &str, scope: &Scope) -> Result<(), StoreError> {
        let conn = self.db.conn();

        let visible: i64 = conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE id = ?1 AND (?2 IS NULL OR doctor_id = ?2)",
            params![id, scope.doctor_id()],
            |row| row.get(0),
        )?;
        if visible == 0 {
            return Err(StoreError::NotFound(
                "Patient not found or unauthorized".to_string(),
            ));
        }

        let appointments: i64 = conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE patient_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if appointments > 0 {
            return Err(StoreError::Conflict(
                "Cannot delete patient with existing appointments".to_string(),
            ));
        }

        conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;

        info!("🗑️  Deleted patient {}", id);
        Ok(())
    }

    fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE email = ?1 AND (?2 IS NULL OR id != ?2)",
            params![email, except_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
