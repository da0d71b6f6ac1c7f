//! Appointment endpoints.

use crate::api::{ensure_doctor, ApiError, AppState};
use crate::auth::models::{User, UserRole};
use crate::records::{appointments, merge_document, missing_field, Appointment, NewAppointment, Scope};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Map, Value};

/// GET /api/appointments
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = state.appointments.list(&Scope::for_user(&caller))?;
    Ok(Json(appointments))
}

/// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = state
        .appointments
        .get(&appointment_id, &Scope::for_user(&caller))?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
    Ok(Json(appointment))
}

/// POST /api/appointments
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if data.is_empty() {
        return Err(ApiError::bad_request("No data provided"));
    }
    if let Some(field) = missing_field(&data, appointments::REQUIRED_FIELDS) {
        return Err(ApiError::bad_request(format!("Missing required field: {}", field)));
    }

    let new: NewAppointment = serde_json::from_value(Value::Object(data))
        .map_err(|e| ApiError::bad_request(format!("Invalid appointment data: {}", e)))?;

    match caller.role {
        UserRole::Doctor if new.doctor_id != caller.id.to_string() => {
            return Err(ApiError::forbidden(
                "Cannot create appointments for other doctors",
            ));
        }
        UserRole::Doctor => {}
        UserRole::Admin => ensure_doctor(&state, &new.doctor_id)?,
    }

    ensure_patient_visible(&state, &caller, &new.patient_id)?;

    let appointment = state.appointments.create(new)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment created successfully",
            "id": appointment.id,
            "appointment": appointment,
        })),
    ))
}

/// PUT /api/appointments/:id
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    if changes.is_empty() {
        return Err(ApiError::bad_request("No data provided"));
    }

    let caller_id = caller.id.to_string();
    if caller.role == UserRole::Doctor {
        if let Some(doctor_id) = changes.get("doctor_id") {
            if doctor_id.as_str() != Some(caller_id.as_str()) {
                return Err(ApiError::forbidden(
                    "Cannot reassign appointments to other doctors",
                ));
            }
        }
    }

    let current = state
        .appointments
        .get(&appointment_id, &Scope::for_user(&caller))?
        .ok_or_else(|| ApiError::not_found("Appointment not found or unauthorized"))?;

    let updated = merge_document(&current, changes)
        .map_err(|e| ApiError::bad_request(format!("Invalid appointment data: {}", e)))?;

    if updated.patient_id != current.patient_id {
        ensure_patient_visible(&state, &caller, &updated.patient_id)?;
    }
    if updated.doctor_id != current.doctor_id {
        ensure_doctor(&state, &updated.doctor_id)?;
    }

    state.appointments.replace(&updated)?;

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": updated,
    })))
}

/// DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .appointments
        .delete(&appointment_id, &Scope::for_user(&caller))?;

    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}

/// Doctors may only book their own patients. Someone else's patient gets the
/// same answer as a missing one.
fn ensure_patient_visible(state: &AppState, caller: &User, patient_id: &str) -> Result<(), ApiError> {
    if state
        .patients
        .get(patient_id, &Scope::for_user(caller))?
        .is_none()
    {
        return Err(ApiError::bad_request("Unknown patient"));
    }
    Ok(())
}
