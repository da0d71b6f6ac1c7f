//! Patient endpoints. Doctors only ever see and touch their own patients.

use crate::api::{ensure_doctor, ApiError, AppState};
use crate::auth::models::{User, UserRole};
use crate::records::{merge_document, missing_field, patients, NewPatient, Patient, Scope};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Map, Value};

/// GET /api/patients
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = state.patients.list(&Scope::for_user(&caller))?;
    Ok(Json(patients))
}

/// GET /api/patients/:id
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .patients
        .get(&patient_id, &Scope::for_user(&caller))?
        .ok_or_else(|| ApiError::not_found("Patient not found"))?;
    Ok(Json(patient))
}

/// POST /api/patients
pub async fn add_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if data.is_empty() {
        return Err(ApiError::bad_request("No data provided"));
    }
    if let Some(field) = missing_field(&data, patients::REQUIRED_FIELDS) {
        return Err(ApiError::bad_request(format!("Missing required field: {}", field)));
    }

    let mut new: NewPatient = serde_json::from_value(Value::Object(data))
        .map_err(|e| ApiError::bad_request(format!("Invalid patient data: {}", e)))?;

    match caller.role {
        // A doctor's patients are always their own
        UserRole::Doctor => new.doctor_id = Some(caller.id.to_string()),
        UserRole::Admin => {
            if let Some(doctor_id) = new.doctor_id.as_deref() {
                ensure_doctor(&state, doctor_id)?;
            }
        }
    }

    let patient = state.patients.create(new)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Patient added successfully",
            "id": patient.id,
            "patient": patient,
        })),
    ))
}

/// PUT /api/patients/:id
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(patient_id): Path<String>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    if changes.is_empty() {
        return Err(ApiError::bad_request("No data provided"));
    }

    let caller_id = caller.id.to_string();
    if caller.role == UserRole::Doctor {
        if let Some(doctor_id) = changes.get("doctor_id") {
            if doctor_id.as_str() != Some(caller_id.as_str()) {
                return Err(ApiError::forbidden("Cannot change patient's doctor"));
            }
        }
    }

    let current = state
        .patients
        .get(&patient_id, &Scope::for_user(&caller))?
        .ok_or_else(|| ApiError::not_found("Patient not found or unauthorized"))?;

    let updated = merge_document(&current, changes)
        .map_err(|e| ApiError::bad_request(format!("Invalid patient data: {}", e)))?;

    if updated.doctor_id != current.doctor_id {
        if let Some(doctor_id) = updated.doctor_id.as_deref() {
            ensure_doctor(&state, doctor_id)?;
        }
    }

    state.patients.replace(&updated)?;

    Ok(Json(json!({
        "message": "Patient updated successfully",
        "patient": updated,
    })))
}

/// DELETE /api/patients/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .patients
        .delete(&patient_id, &Scope::for_user(&caller))?;

    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::{build_router, test_support::*};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn patient_body(name: &str, email: &str) -> Value {
        json!({
            "name": name,
            "email": email,
            "phone": "555-0100",
            "address": "1 Main St",
            "date_of_birth": "1980-04-12",
        })
    }

    #[tokio::test]
    async fn test_doctor_owns_created_patient() {
        let state = seeded_state();
        let doctor_id = state.users.get_user_by_username("doctor1").unwrap().unwrap().id;
        let token = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state);

        let mut body = patient_body("Jane Roe", "jane@example.com");
        body["doctor_id"] = json!("someone-else");
        let (status, created) =
            send(&app, json_request("POST", "/api/patients", Some(&token), body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["patient"]["doctor_id"], doctor_id.to_string());
    }

    #[tokio::test]
    async fn test_missing_field_rejected() {
        let state = seeded_state();
        let token = token_for(&state, "admin", "admin123");
        let app = build_router(state);

        let (status, body) = send(
            &app,
            json_request("POST", "/api/patients", Some(&token), json!({
                "name": "Jane Roe",
                "email": "jane@example.com",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required field: phone");

        let (status, _) =
            send(&app, json_request("POST", "/api/patients", Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_doctor_visibility() {
        let state = seeded_state();
        state
            .users
            .create_user("doctor2", "doctor2@hospital.com", "doctor234", crate::auth::UserRole::Doctor)
            .unwrap();
        let doc1 = token_for(&state, "doctor1", "doctor123");
        let doc2 = token_for(&state, "doctor2", "doctor234");
        let admin = token_for(&state, "admin", "admin123");
        let app = build_router(state);

        let (_, created) = send(
            &app,
            json_request("POST", "/api/patients", Some(&doc1), patient_body("A", "a@example.com")),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (_, list) = send(&app, json_request("GET", "/api/patients", Some(&doc2), Value::Null)).await;
        assert!(list.as_array().unwrap().is_empty());

        let (_, list) = send(&app, json_request("GET", "/api/patients", Some(&admin), Value::Null)).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let uri = format!("/api/patients/{}", id);
        let (status, _) = send(&app, json_request("GET", &uri, Some(&doc2), Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            json_request("PUT", &uri, Some(&doc2), json!({"phone": "555-0000"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, json_request("DELETE", &uri, Some(&doc2), Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, json_request("GET", &uri, Some(&doc1), Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_patient() {
        let state = seeded_state();
        let doc1 = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state);

        let (_, created) = send(
            &app,
            json_request("POST", "/api/patients", Some(&doc1), patient_body("A", "a@example.com")),
        )
        .await;
        send(
            &app,
            json_request("POST", "/api/patients", Some(&doc1), patient_body("B", "b@example.com")),
        )
        .await;
        let uri = format!("/api/patients/{}", created["id"].as_str().unwrap());

        let (status, _) = send(
            &app,
            json_request("PUT", &uri, Some(&doc1), json!({"doctor_id": "another-doctor"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            json_request("PUT", &uri, Some(&doc1), json!({"email": "b@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            json_request("PUT", &uri, Some(&doc1), json!({"phone": "555-0199", "allergies": "none"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"]["phone"], "555-0199");
        assert_eq!(body["patient"]["allergies"], "none");
        assert_eq!(body["patient"]["name"], "A");
    }

    #[tokio::test]
    async fn test_admin_assigns_unknown_doctor() {
        let state = seeded_state();
        let admin = token_for(&state, "admin", "admin123");
        let app = build_router(state);

        let mut body = patient_body("A", "a@example.com");
        body["doctor_id"] = json!(uuid::Uuid::new_v4().to_string());
        let (status, _) = send(&app, json_request("POST", "/api/patients", Some(&admin), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
