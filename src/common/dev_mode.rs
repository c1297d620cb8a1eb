// src/common/dev_mode.rs
//! Development mode configuration and utilities
//! Allows bypassing authentication for testing purposes

use sqlx::SqlitePool;
use std::env;

use crate::auth::models::Role;

/// Fixed id so the dev user is stable across requests and restarts
pub const DEV_USER_ID: &str = "USR0000000";

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let user_email = env::var("DEV_USER_EMAIL").unwrap_or_else(|_| "dev@test.com".to_string());

        let user_name = env::var("DEV_USER_NAME").unwrap_or_else(|_| "Dev User".to_string());

        let user_role = env::var("DEV_USER_ROLE")
            .ok()
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or(Role::Employer);

        Self {
            enabled,
            user_email,
            user_name,
            user_role,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for DevModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_email: "dev@test.com".to_string(),
            user_name: "Dev User".to_string(),
            user_role: Role::Employer,
        }
    }
}

/// Make sure the dev user row exists so foreign keys on jobs/interviews hold
pub async fn ensure_dev_user(pool: &SqlitePool, config: &DevModeConfig) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, email_verified)
        VALUES (?, ?, ?, '', ?, 1)
        ON CONFLICT(id) DO UPDATE SET
            email = excluded.email,
            name = excluded.name,
            role = excluded.role
        "#,
    )
    .bind(DEV_USER_ID)
    .bind(config.user_email.to_lowercase())
    .bind(&config.user_name)
    .bind(config.user_role.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        println!("⚠️  🔓 DEV MODE ENABLED 🔓 ⚠️");
        println!("   Authentication bypassed for testing");
        println!("   Dev User: {} ({})", config.user_name, config.user_email);
        println!("   Role: {}", config.user_role.as_str());
        println!("   ⚠️  DO NOT USE IN PRODUCTION ⚠️");
        println!();
    } else {
        println!("🔒 Production mode - Authentication required");
    }
}

/// CLI argument parsing for dev mode
fn parse_dev_mode_args<I: IntoIterator<Item = String>>(args: I) -> Option<bool> {
    for arg in args {
        match arg.as_str() {
            "--dev" | "--dev-mode" => return Some(true),
            "--no-dev" | "--prod" | "--production" => return Some(false),
            _ => {}
        }
    }

    None
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args(env::args()) {
        println!("🔧 CLI override: DEV_MODE = {}", cli_dev_mode);
        config.enabled = cli_dev_mode;
    }

    config
}
