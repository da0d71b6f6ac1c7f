//! Authentication API Endpoints
//! Login, profile, password change and admin user management.

use crate::api::{ApiError, AppState};
use crate::auth::models::{
    check_new_account, check_password_strength, ChangePasswordRequest, CreateUserRequest,
    LoginRequest, LoginResponse, UpdateUserRequest, User, UserResponse, UserRole,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("🔐 Login attempt: {}", payload.username);

    let issued = state
        .authenticator
        .issue(&payload.username, &payload.password)?;

    info!(
        "✅ Login successful: {} ({})",
        issued.user.username,
        issued.user.role.as_str()
    );

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        username: issued.user.username.clone(),
        role: issued.user.role,
        user: UserResponse::from_user(&issued.user),
    }))
}

/// Get current user info - GET /api/auth/me
pub async fn get_current_user(Extension(caller): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from_user(&caller))
}

/// Change own password - POST /api/users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if state
        .users
        .verify_password(&caller.username, &payload.current_password)?
        .is_none()
    {
        warn!("Password change with wrong current password: {}", caller.username);
        return Err(ApiError::forbidden("Incorrect current password"));
    }

    check_password_strength(&payload.new_password).map_err(ApiError::bad_request)?;

    state.users.set_password(&caller.id, &payload.new_password)?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// List all users - GET /api/users (Admin only)
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_users()?;
    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}

/// Create user - POST /api/users/register (Admin only)
pub async fn register_user(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();
    check_new_account(username, email, &payload.password).map_err(ApiError::bad_request)?;

    let role = payload.role.unwrap_or(UserRole::Doctor);
    let user = state
        .users
        .create_user(username, email, &payload.password, role)?;

    info!(
        "✅ User created by {}: {} ({})",
        caller.username,
        user.username,
        user.role.as_str()
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Get user by ID - GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let uuid = parse_user_id(&user_id)?;
    let user = state
        .users
        .get_user_by_id(&uuid)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Update user - PUT /api/users/:id (Admin only)
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let uuid = parse_user_id(&user_id)?;

    if let Some(username) = payload.username.as_deref() {
        let current = state
            .users
            .get_user_by_id(&uuid)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if username != current.username {
            return Err(ApiError::bad_request("Username cannot be changed"));
        }
    }

    let email = payload.email.as_deref().map(str::trim);
    if email == Some("") {
        return Err(ApiError::bad_request("Email cannot be empty"));
    }
    if email.is_none() && payload.role.is_none() {
        return Err(ApiError::bad_request("No changes supplied"));
    }

    let user = state.users.update_user(&uuid, email, payload.role)?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// Delete user - DELETE /api/users/:id (Admin only)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let uuid = parse_user_id(&user_id)?;

    // Don't allow deleting yourself
    if uuid == caller.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    state.users.delete_user(&uuid)?;

    info!("🗑️  User deleted by {}: {}", caller.username, user_id);

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid user ID format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::{build_router, test_support::*};
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_login_success() {
        let state = seeded_state();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            json_request("POST", "/api/auth/login", None, json!({
                "username": "admin",
                "password": "admin123",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["username"], "admin");
        assert_eq!(body["role"], "admin");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = build_router(seeded_state());

        let (status, body) = send(
            &app,
            json_request("POST", "/api/auth/login", None, json!({
                "username": "admin",
                "password": "wrong",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "InvalidCredentials");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = build_router(seeded_state());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"], "MissingToken");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(AUTHORIZATION, "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"], "MalformedToken");
    }

    #[tokio::test]
    async fn test_me_returns_caller() {
        let state = seeded_state();
        let token = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state);

        let (status, body) = send(&app, json_request("GET", "/api/auth/me", Some(&token), Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "doctor1");
        assert_eq!(body["email"], "doctor1@hospital.com");
    }

    #[tokio::test]
    async fn test_user_admin_routes_reject_doctor() {
        let state = seeded_state();
        let token = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state);

        let (status, body) = send(&app, json_request("GET", "/api/users", Some(&token), Value::Null)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");

        let (status, _) = send(
            &app,
            json_request("POST", "/api/users/register", Some(&token), json!({
                "username": "sneaky",
                "email": "sneaky@hospital.com",
                "password": "password123",
                "role": "admin",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_register_and_manage_user() {
        let state = seeded_state();
        let admin = token_for(&state, "admin", "admin123");
        let app = build_router(state);

        let (status, created) = send(
            &app,
            json_request("POST", "/api/users/register", Some(&admin), json!({
                "username": "doctor2",
                "email": "doctor2@hospital.com",
                "password": "doctor234",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "doctor");
        let id = created["id"].as_str().unwrap().to_string();

        // Duplicate username
        let (status, _) = send(
            &app,
            json_request("POST", "/api/users/register", Some(&admin), json!({
                "username": "doctor2",
                "email": "other@hospital.com",
                "password": "doctor234",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Weak password
        let (status, _) = send(
            &app,
            json_request("POST", "/api/users/register", Some(&admin), json!({
                "username": "doctor3",
                "email": "doctor3@hospital.com",
                "password": "short",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Username is immutable
        let (status, _) = send(
            &app,
            json_request("PUT", &format!("/api/users/{}", id), Some(&admin), json!({
                "username": "renamed",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            &app,
            json_request("PUT", &format!("/api/users/{}", id), Some(&admin), json!({
                "email": "doc2@hospital.com",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["email"], "doc2@hospital.com");
        assert_eq!(updated["username"], "doctor2");

        let (status, listed) = send(&app, json_request("GET", "/api/users", Some(&admin), Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 3);

        let (status, _) = send(
            &app,
            json_request("DELETE", &format!("/api/users/{}", id), Some(&admin), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request("GET", &format!("/api/users/{}", id), Some(&admin), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let state = seeded_state();
        let admin_id = state.users.get_user_by_username("admin").unwrap().unwrap().id;
        let admin = token_for(&state, "admin", "admin123");
        let app = build_router(state);

        let (status, body) = send(
            &app,
            json_request("DELETE", &format!("/api/users/{}", admin_id), Some(&admin), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot delete your own account");
    }

    #[tokio::test]
    async fn test_doctor_can_read_user_by_id() {
        let state = seeded_state();
        let admin_id = state.users.get_user_by_username("admin").unwrap().unwrap().id;
        let token = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state);

        let (status, body) = send(
            &app,
            json_request("GET", &format!("/api/users/{}", admin_id), Some(&token), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "admin");

        let (status, _) = send(
            &app,
            json_request("GET", "/api/users/not-a-uuid", Some(&token), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_change_password() {
        let state = seeded_state();
        let token = token_for(&state, "doctor1", "doctor123");
        let app = build_router(state.clone());

        let (status, _) = send(
            &app,
            json_request("POST", "/api/users/change-password", Some(&token), json!({
                "current_password": "wrong-one",
                "new_password": "brandnew123",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            json_request("POST", "/api/users/change-password", Some(&token), json!({
                "current_password": "doctor123",
                "new_password": "brandnew123",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        assert!(state.authenticator.issue("doctor1", "doctor123").is_err());
        assert!(state.authenticator.issue("doctor1", "brandnew123").is_ok());
    }
}
