//! Appointment records.

use crate::db::{Database, StoreError};
use crate::records::{strip_server_fields, Scope};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

pub const REQUIRED_FIELDS: &[&str] = &["patient_id", "doctor_id", "date", "time", "reason"];

/// Status given to every new appointment.
pub const INITIAL_STATUS: &str = "scheduled";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub reason: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct AppointmentStore {
    db: Database,
}

impl AppointmentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let mut extra = new.extra;
        strip_server_fields(&mut extra, &["status"]);

        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            date: new.date,
            time: new.time,
            reason: new.reason,
            status: INITIAL_STATUS.to_string(),
            created_at: Utc::now().to_rfc3339(),
            extra,
        };

        let document = serde_json::to_string(&appointment)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO appointments (id, patient_id, doctor_id, document, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                document,
                appointment.created_at,
            ],
        )?;

        info!(
            "📅 Scheduled appointment {} (patient {}, doctor {})",
            appointment.id, appointment.patient_id, appointment.doctor_id
        );
        Ok(appointment)
    }

    pub fn list(&self, scope: &Scope) -> Result<Vec<Appointment>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT document FROM appointments
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

    pub fn get(&self, id: &str, scope: &Scope) -> Result<Option<Appointment>, StoreError> {
        let conn = self.db.conn();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM appointments
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

    pub fn replace(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let document = serde_json::to_string(appointment)?;
        let conn = self.db.conn();
        let rows_affected = conn.execute(
            "UPDATE appointments SET patient_id = ?1, doctor_id = ?2, document = ?3 WHERE id = ?4",
            params![
                appointment.patient_id,
                appointment.doctor_id,
                document,
                appointment.id
            ],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound("Appointment not found".to_string()));
        }
        Ok(())
    }

    pub fn delete(&self, id: &str, scope: &Scope) -> Result<(), StoreError> {
        let conn = self.db.conn();
        let rows_affected = conn.execute(
            "DELETE FROM appointments WHERE id = ?1 AND (?2 IS NULL OR doctor_id = ?2)",
            params![id, scope.doctor_id()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(
                "Appointment not found or unauthorized".to_string(),
            ));
        }

        info!("🗑️  Deleted appointment {}", id);
        Ok(())
    }
}
