// Application state shared across all modules

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

use crate::common::dev_mode::DevModeConfig;
use crate::common::id_generator::IdAllocator;
use crate::services::{Mailer, OtpService};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub admin_emails: HashSet<String>,
    pub dev_mode: DevModeConfig,
    pub ids: IdAllocator,
    pub otp_service: Arc<OtpService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::otp::OtpConfig;
    use crate::services::LogMailer;

    pub fn test_state(db: SqlitePool) -> AppState {
        AppState {
            db,
            jwt_secret: "test_secret".to_string(),
            jwt_ttl_hours: 1,
            admin_emails: HashSet::from(["admin@example.com".to_string()]),
            dev_mode: DevModeConfig::default(),
            ids: IdAllocator::new(),
            otp_service: Arc::new(OtpService::new(OtpConfig::default())),
            mailer: Arc::new(LogMailer),
        }
    }
}
