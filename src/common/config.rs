// src/common/config.rs
//! Process configuration read from the environment (`.env` is loaded first)

use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub admin_emails: HashSet<String>,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://hirehub.db".to_string(),
            port: 8080,
            jwt_secret: "replace_with_strong_secret".to_string(),
            jwt_ttl_hours: 24,
            admin_emails: HashSet::new(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            config.port = port;
        }

        if let Ok(secret) = env::var("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        if let Some(hours) = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
        {
            config.jwt_ttl_hours = hours;
        }

        // ADMIN_EMAILS - comma-separated, compared case-insensitively
        if let Ok(raw) = env::var("ADMIN_EMAILS") {
            config.admin_emails = parse_admin_emails(&raw);
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = split_list(&origins);
        }

        config
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_admin_emails(raw: &str) -> HashSet<String> {
    split_list(raw)
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect()
}
