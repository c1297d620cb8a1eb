//! Authentication handlers

use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::models::{
    AuthResponse, Claims, LoginRequest, RegisterRequest, ResendOtpRequest, Role, User,
    VerifyEmailRequest,
};
use super::password::{spawn_hash_password, spawn_verify_password};
use super::validators::RegisterValidator;
use crate::common::error::is_unique_violation_on;
use crate::common::{next_entity_id, safe_email_log, ApiError, AppState, EntityPrefix, Validator};
use crate::services::email::otp_template;

/// Sign a session token for `user`
pub fn create_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::hours(state.jwt_ttl_hours)).timestamp() as usize;
    let claims = Claims {
        sub: user.id.clone(),
        role: user.role(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user.id, "JWT encoding error during authentication");
        ApiError::InternalServer("jwt error".to_string())
    })
}

async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, email = %safe_email_log(email), "Database error looking up user");
            ApiError::DatabaseError(e)
        })
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = create_token(state, &user)?;
    let is_admin = user.role() == Role::Admin || state.is_admin_email(&user.email);
    Ok(AuthResponse {
        token,
        user,
        is_admin,
    })
}

/// Issue a fresh code and mail it; delivery failures are logged only
async fn send_verification_code(state: &AppState, user: &User) -> Result<(), ApiError> {
    let code = state.otp_service.issue(&user.email).await?;
    let ttl_minutes = state.otp_service.config().ttl.as_secs().div_ceil(60);
    let template = otp_template(&user.name, &code, ttl_minutes);

    if let Err(e) = state
        .mailer
        .send(&user.email, &template.subject, &template.body)
        .await
    {
        warn!(
            error = %e,
            email = %safe_email_log(&user.email),
            "Failed to send verification code"
        );
    }

    Ok(())
}

/// POST /api/auth/register
///
/// Creates an unverified account and mails a verification code.
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();

    let validation = RegisterValidator.validate(&request);
    if !validation.is_valid {
        warn!(errors = ?validation.errors, "Registration validation failed");
        return Err(validation.into());
    }

    let email = request.email.trim().to_lowercase();
    let role: Role = request.role.parse().map_err(ApiError::BadRequest)?;

    if find_user_by_email(&state.db, &email).await?.is_some() {
        info!(email = %safe_email_log(&email), "Registration rejected: email already registered");
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = spawn_hash_password(request.password.clone()).await?;

    let user_id = {
        let _lease = state.ids.lease().await;
        let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

        let user_id = next_entity_id(&mut tx, EntityPrefix::User)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, role, email_verified) VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(&user_id)
        .bind(&email)
        .bind(request.name.trim())
        .bind(&password_hash)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "users.email") {
                ApiError::Conflict("Email is already registered".to_string())
            } else {
                error!(error = %e, "Database error creating user");
                ApiError::DatabaseError(e)
            }
        })?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        user_id
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        role = %role,
        "User registered, awaiting email verification"
    );

    send_verification_code(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "user": user,
            "message": "Verification code sent"
        })),
    ))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let email = request.email.trim().to_lowercase();

    let user = find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account for this email".to_string()))?;

    if user.email_verified {
        return Err(ApiError::BadRequest("Email is already verified".to_string()));
    }

    state.otp_service.verify(&email, request.code.trim()).await?;

    sqlx::query("UPDATE users SET email_verified = 1 WHERE id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "Database error marking email verified");
            ApiError::DatabaseError(e)
        })?;

    info!(user_id = %user.id, "Email verified");

    let user = User {
        email_verified: true,
        ..user
    };
    Ok(Json(auth_response(&state, user)?))
}

/// POST /api/auth/resend-otp
///
/// Answers the same way for unknown, verified and rate-limited addresses.
pub async fn resend_otp(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(request): Json<ResendOtpRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();
    let email = request.email.trim().to_lowercase();

    match find_user_by_email(&state.db, &email).await? {
        Some(user) if !user.email_verified => match send_verification_code(&state, &user).await {
            Ok(()) => debug!(user_id = %user.id, "Verification code re-sent"),
            // cooldown and send limits stay invisible to the caller
            Err(e) => info!(user_id = %user.id, error = ?e, "Resend refused"),
        },
        _ => {
            debug!(email = %safe_email_log(&email), "Resend skipped: no pending verification");
        }
    }

    Ok(Json(serde_json::json!({
        "message": "If the account is awaiting verification, a new code has been sent"
    })))
}

/// POST /api/auth/login
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let email = request.email.trim().to_lowercase();

    let user = match find_user_by_email(&state.db, &email).await? {
        Some(user) => {
            let matches =
                spawn_verify_password(request.password.clone(), user.password_hash.clone()).await?;
            matches.then_some(user)
        }
        None => None,
    };
    let Some(user) = user else {
        warn!(email = %safe_email_log(&email), "Login failed: invalid credentials");
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    };

    if !user.email_verified {
        warn!(user_id = %user.id, "Login refused: email not verified");
        return Err(ApiError::Forbidden("Email is not verified".to_string()));
    }

    info!(user_id = %user.id, "User login successful");
    Ok(Json(auth_response(&state, user)?))
}

/// GET /api/me
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "user": user,
        "is_admin": authed.is_admin
    })))
}
