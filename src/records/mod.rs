//! Clinical records: patients and appointments.
//!
//! Both are stored as JSON documents. Clients may attach extra fields beyond
//! the required ones; those are kept verbatim in `extra`.

pub mod appointments;
pub mod patients;

pub use appointments::{Appointment, AppointmentStore, NewAppointment};
pub use patients::{NewPatient, Patient, PatientStore};

use crate::auth::models::{User, UserRole};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Which records a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Doctor(String),
}

impl Scope {
    /// Admins see everything, doctors only records assigned to them.
    pub fn for_user(user: &User) -> Self {
        match user.role {
            UserRole::Admin => Scope::All,
            UserRole::Doctor => Scope::Doctor(user.id.to_string()),
        }
    }

    pub fn doctor_id(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Doctor(id) => Some(id),
        }
    }
}

/// Fields the server owns; clients can neither set nor change them.
pub(crate) const SERVER_FIELDS: &[&str] = &["id", "created_at"];

/// Name of the first field in `fields` missing from `data`.
pub fn missing_field<'a>(data: &Map<String, Value>, fields: &[&'a str]) -> Option<&'a str> {
    fields.iter().copied().find(|f| !data.contains_key(*f))
}

/// Apply `changes` on top of `current` and re-validate the result.
///
/// Keys listed in `SERVER_FIELDS` are ignored.
pub fn merge_document<T>(current: &T, changes: Map<String, Value>) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut doc = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in changes {
        if SERVER_FIELDS.contains(&key.as_str()) {
            continue;
        }
        doc.insert(key, value);
    }
    serde_json::from_value(Value::Object(doc))
}

pub(crate) fn strip_server_fields(extra: &mut Map<String, Value>, also: &[&str]) {
    for key in SERVER_FIELDS.iter().chain(also) {
        extra.remove(*key);
    }
}
