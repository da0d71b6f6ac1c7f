//! User seeding tool
//!
//! Creates the initial accounts for a fresh database, or one explicit account.
//!
//! Usage:
//!   cargo run --bin create_users
//!   cargo run --bin create_users -- --username doctor2 --email doctor2@hospital.com --password s3cretpass --role doctor
//!   cargo run --bin create_users -- --database-path ./medrecords.db --list

use anyhow::{Context, Result};
use clap::Parser;
use medrecords_backend::{
    auth::{models::check_new_account, UserRole, UserStore},
    config::DEFAULT_DATABASE_PATH,
    Database,
};

/// Default accounts: (username, email, password, role)
const DEFAULT_USERS: &[(&str, &str, &str, UserRole)] = &[
    ("admin", "admin@hospital.com", "admin123", UserRole::Admin),
    ("doctor1", "doctor1@hospital.com", "doctor123", UserRole::Doctor),
];

/// Seed user accounts for the medical records backend
#[derive(Parser, Debug)]
#[command(name = "create_users")]
#[command(about = "Create login accounts in the medical records database")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, env = "DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    database_path: String,

    /// bcrypt work factor for new passwords
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    bcrypt_cost: u32,

    /// Username of a single account to create
    #[arg(long, requires_all = ["email", "password"])]
    username: Option<String>,

    #[arg(long, requires = "username")]
    email: Option<String>,

    #[arg(long, requires = "username")]
    password: Option<String>,

    /// `admin` or `doctor`
    #[arg(long, requires = "username", default_value = "doctor")]
    role: UserRole,

    /// List existing accounts instead of creating any
    #[arg(long, conflicts_with = "username")]
    list: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medrecords_backend=info".into()),
        )
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let db = Database::new(&cli.database_path)
        .with_context(|| format!("Failed to open database at {}", cli.database_path))?;
    let users = UserStore::new(db, cli.bcrypt_cost);

    if cli.list {
        for user in users.list_users()? {
            println!(
                "{}  {:<16} {:<32} {}",
                user.id, user.username, user.email, user.role
            );
        }
        return Ok(());
    }

    match (cli.username, cli.email, cli.password) {
        (Some(username), Some(email), Some(password)) => {
            let (username, email) = (username.trim(), email.trim());
            check_new_account(username, email, &password).map_err(anyhow::Error::msg)?;
            seed(&users, username, email, &password, cli.role)?;
        }
        _ => {
            for (username, email, password, role) in DEFAULT_USERS {
                seed(&users, username, email, password, *role)?;
            }
        }
    }

    Ok(())
}

fn seed(users: &UserStore, username: &str, email: &str, password: &str, role: UserRole) -> Result<()> {
    match users
        .create_user_if_missing(username, email, password, role)
        .with_context(|| format!("Failed to create {}", username))?
    {
        Some(user) => println!("✅ Created {} ({})", user.username, user.role),
        None => println!("⏭️  {} already exists, skipped", username),
    }
    Ok(())
}
