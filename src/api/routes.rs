use axum::{
    middleware,
    response::Json,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{appointments, patients};
use crate::auth::{self, auth_middleware, Authenticator, Guard, JwtHandler, UserRole, UserStore};
use crate::db::Database;
use crate::middleware::request_logging;
use crate::records::{AppointmentStore, PatientStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub patients: Arc<PatientStore>,
    pub appointments: Arc<AppointmentStore>,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    /// Wire every store to the one `Database` handle.
    pub fn new(db: Database, jwt: JwtHandler, hash_cost: u32) -> Self {
        let users = Arc::new(UserStore::new(db.clone(), hash_cost));
        Self {
            authenticator: Arc::new(Authenticator::new(users.clone(), jwt)),
            patients: Arc::new(PatientStore::new(db.clone())),
            appointments: Arc::new(AppointmentStore::new(db)),
            users,
        }
    }
}

/// Create the API router
pub fn build_router(state: AppState) -> Router {
    let any = Guard::authenticated(state.authenticator.clone());
    let admin = Guard::require(state.authenticator.clone(), UserRole::Admin);

    Router::new()
        .route("/health", get(health_check))
        // Auth
        .route("/api/auth/login", post(auth::api::login))
        .route("/api/auth/me", guarded(get(auth::api::get_current_user), &any))
        .route(
            "/api/auth/profile",
            guarded(get(auth::api::get_current_user), &any),
        )
        // Users
        .route(
            "/api/users/change-password",
            guarded(post(auth::api::change_password), &any),
        )
        .route("/api/users", guarded(get(auth::api::list_users), &admin))
        .route(
            "/api/users/register",
            guarded(post(auth::api::register_user), &admin),
        )
        .route(
            "/api/users/:id",
            guarded(get(auth::api::get_user), &any).merge(guarded(
                put(auth::api::update_user).delete(auth::api::delete_user),
                &admin,
            )),
        )
        // Paths served by earlier clients
        .route("/api/users/login", post(auth::api::login))
        .route(
            "/api/users/update/:id",
            guarded(put(auth::api::update_user), &admin),
        )
        .route(
            "/api/users/delete/:id",
            guarded(delete(auth::api::delete_user), &admin),
        )
        // Patients
        .route(
            "/api/patients",
            guarded(
                get(patients::list_patients).post(patients::add_patient),
                &any,
            ),
        )
        .route(
            "/api/patients/:id",
            guarded(
                get(patients::get_patient)
                    .put(patients::update_patient)
                    .delete(patients::delete_patient),
                &any,
            ),
        )
        // Appointments
        .route(
            "/api/appointments",
            guarded(
                get(appointments::list_appointments).post(appointments::create_appointment),
                &any,
            ),
        )
        .route(
            "/api/appointments/:id",
            guarded(
                get(appointments::get_appointment)
                    .put(appointments::update_appointment)
                    .delete(appointments::delete_appointment),
                &any,
            ),
        )
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Attach `guard` to every method of `route`.
fn guarded(route: MethodRouter<AppState>, guard: &Guard) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(guard.clone(), auth_middleware))
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// State over an in-memory database holding `admin` and `doctor1`.
    pub fn seeded_state() -> AppState {
        let state = AppState::new(
            Database::in_memory().unwrap(),
            JwtHandler::new("router-test-secret".to_string()),
            4,
        );
        state
            .users
            .create_user("admin", "admin@hospital.com", "admin123", UserRole::Admin)
            .unwrap();
        state
            .users
            .create_user("doctor1", "doctor1@hospital.com", "doctor123", UserRole::Doctor)
            .unwrap();
        state
    }

    pub fn token_for(state: &AppState, username: &str, password: &str) -> String {
        state.authenticator.issue(username, password).unwrap().token
    }

    /// `Value::Null` sends no body.
    pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if body.is_null() {
            builder.body(Body::empty()).unwrap()
        } else {
            builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }
    }

    pub async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, read_json(response).await)
    }
}
