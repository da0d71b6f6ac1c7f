//! HTTP surface: router, shared state and the record handlers.

pub mod appointments;
pub mod error;
pub mod patients;
pub mod routes;

pub use error::ApiError;
pub use routes::{build_router, AppState};

use crate::auth::UserRole;
use uuid::Uuid;

/// Fail with 400 unless `doctor_id` names an existing doctor account.
pub(crate) fn ensure_doctor(state: &AppState, doctor_id: &str) -> Result<(), ApiError> {
    let is_doctor = match Uuid::parse_str(doctor_id) {
        Ok(id) => state
            .users
            .get_user_by_id(&id)?
            .map_or(false, |user| user.role == UserRole::Doctor),
        Err(_) => false,
    };

    if !is_doctor {
        return Err(ApiError::bad_request("doctor_id must reference a doctor account"));
    }
    Ok(())
}
