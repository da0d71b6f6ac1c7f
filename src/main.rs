//! Medical records API server.

use anyhow::{Context, Result};
use medrecords_backend::{auth::JwtHandler, build_router, AppState, Config, Database};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    info!("🚀 Medical records backend starting");
    info!("Config: {:?}", config);

    let db = Database::new(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    info!("💾 Database ready at {}", config.database_path);

    let jwt = JwtHandler::new(config.jwt_secret.clone())
        .with_expiration_hours(config.token_ttl_hours);
    let state = AppState::new(db, jwt, config.bcrypt_cost);

    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medrecords_backend=debug,medrecords=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
