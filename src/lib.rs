//! Medical records backend library
//!
//! Exposes the stores, auth layer and router for the server binary, the
//! seeding tool and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod records;

pub use api::{build_router, AppState};
pub use config::Config;
pub use db::Database;
