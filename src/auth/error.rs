//! Authentication failure kinds and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Every way authentication or authorization can reject a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    MalformedToken,
    InvalidSignature,
    Expired,
    UnknownSubject,
    InvalidCredentials,
    Forbidden,
    /// Store failure while authenticating; details stay in the logs.
    Internal,
}

impl AuthError {
    /// Stable identifier returned in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MissingToken",
            AuthError::MalformedToken => "MalformedToken",
            AuthError::InvalidSignature => "InvalidSignature",
            AuthError::Expired => "Expired",
            AuthError::UnknownSubject => "UnknownSubject",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::Forbidden => "Forbidden",
            AuthError::Internal => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => {
                "Missing authorization token. Use: Authorization: Bearer {token}"
            }
            AuthError::MalformedToken => "Malformed token",
            AuthError::InvalidSignature => "Invalid token signature",
            AuthError::Expired => "Token has expired",
            AuthError::UnknownSubject => "Token subject no longer exists",
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::Forbidden => "Insufficient permissions",
            AuthError::Internal => "Internal server error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}
