//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Claims, Role, User};
use crate::common::dev_mode::DEV_USER_ID;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer JWT and reloads the user so role changes and
/// deletions take effect before the token expires. Admin rights come from
/// the `admin` role or from `ADMIN_EMAILS`.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
}

impl AuthedUser {
    /// Employers and admins
    pub fn require_employer(&self) -> Result<(), ApiError> {
        if self.role == Role::Employer || self.is_admin {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Employer access denied");
            Err(ApiError::Forbidden("Employer account required".to_string()))
        }
    }

    pub fn require_candidate(&self) -> Result<(), ApiError> {
        if self.role == Role::Candidate {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Candidate access denied");
            Err(ApiError::Forbidden("Candidate account required".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            warn!(user_id = %self.id, "Admin access denied");
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Strip an optional `Bearer ` prefix
fn bare_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        // DEV MODE: Bypass authentication completely
        if app_state.dev_mode.is_enabled() {
            let dev = &app_state.dev_mode;
            let is_admin = dev.user_role == Role::Admin || app_state.is_admin_email(&dev.user_email);

            debug!(
                user_id = %DEV_USER_ID,
                email = %safe_email_log(&dev.user_email),
                role = %dev.user_role,
                is_admin = is_admin,
                "DEV MODE: Authentication bypassed"
            );

            return Ok(AuthedUser {
                id: DEV_USER_ID.to_string(),
                email: dev.user_email.to_lowercase(),
                role: dev.user_role,
                is_admin,
            });
        }

        let Some(header) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Unauthorized("missing auth".into()));
        };

        let decoded = decode::<Claims>(
            bare_token(header),
            &DecodingKey::from_secret(app_state.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            warn!(error = %e, "JWT token validation failed");
            ApiError::Unauthorized("invalid token".into())
        })?;

        let user_id = decoded.claims.sub;

        let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&app_state.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %user_id,
                    "Database error during user lookup in authentication"
                );
                ApiError::DatabaseError(e)
            })?;

        match user {
            Some(u) if u.email_verified => {
                let role = u.role();
                let is_admin = role == Role::Admin || app_state.is_admin_email(&u.email);
                debug!(
                    user_id = %u.id,
                    email = %safe_email_log(&u.email),
                    role = %role,
                    is_admin = is_admin,
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser {
                    id: u.id,
                    email: u.email,
                    role,
                    is_admin,
                })
            }
            Some(u) => {
                warn!(user_id = %u.id, "Authentication failed: email not verified");
                Err(ApiError::Forbidden("email not verified".into()))
            }
            None => {
                warn!(user_id = %user_id, "Authentication failed: user not found in database");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}
