//! Authentication Module
//! Password login, signed bearer tokens and role-based route guards.

pub mod api;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod user_store;

pub use error::AuthError;
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, Guard};
pub use models::{User, UserRole};
pub use service::{Authenticator, IssuedToken};
pub use user_store::UserStore;
