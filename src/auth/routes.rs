//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/register` - Create an account and mail a verification code
/// - `POST /api/auth/verify-email` - Confirm the code and receive a token
/// - `POST /api/auth/resend-otp` - Request a new code
/// - `POST /api/auth/login` - Email and password login
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/verify-email", post(handlers::verify_email))
        .route("/api/auth/resend-otp", post(handlers::resend_otp))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/me", get(handlers::me_handler))
}
