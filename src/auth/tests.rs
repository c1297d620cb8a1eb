//! Tests for auth module
//!
//! Registration, verification and login run against an in-memory database
//! with a recording mailer standing in for delivery.

use super::extractors::AuthedUser;
use super::handlers::{login, me_handler, register, resend_otp, verify_email};
use super::models::{Claims, LoginRequest, RegisterRequest, ResendOtpRequest, Role, VerifyEmailRequest};
use super::validators::RegisterValidator;
use crate::common::migrations::test_support::test_pool;
use crate::common::state::test_support::test_state;
use crate::common::{ApiError, AppState, Validator};
use crate::services::email::test_support::RecordingMailer;
use axum::extract::{Extension, FromRequestParts, Json};
use axum::http::{Request, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use regex::Regex;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Harness {
    shared: Arc<RwLock<AppState>>,
    mailer: Arc<RecordingMailer>,
}

async fn harness() -> Harness {
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        mailer: mailer.clone(),
        ..test_state(test_pool().await)
    };
    Harness {
        shared: Arc::new(RwLock::new(state)),
        mailer,
    }
}

fn register_request(email: &str, role: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        name: "Jane Doe".to_string(),
        password: "hunter2hunter2".to_string(),
        role: role.to_string(),
    }
}

fn last_code(mailer: &RecordingMailer) -> String {
    let pattern = Regex::new(r#"class="code">(\d{6})<"#).unwrap();
    let messages = mailer.messages();
    let body = &messages.last().expect("no mail sent").body;
    pattern.captures(body).expect("no code in mail")[1].to_string()
}

async fn authed_from_token(shared: &Arc<RwLock<AppState>>, token: &str) -> Result<AuthedUser, ApiError> {
    let request = Request::builder()
        .header("authorization", format!("Bearer {}", token))
        .extension(shared.clone())
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();
    AuthedUser::from_request_parts(&mut parts, &()).await
}

#[test]
fn test_register_validator() {
    assert!(RegisterValidator.validate(&register_request("jane@example.com", "candidate")).is_valid);

    let mut bad = register_request("not-an-email", "admin");
    bad.password = "short".to_string();
    let result = RegisterValidator.validate(&bad);
    let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["email", "password", "role"]);
}

#[tokio::test]
async fn test_register_verify_login_flow() {
    let h = harness().await;

    let (status, Json(body)) = register(
        Extension(h.shared.clone()),
        Json(register_request("Jane@Example.com", "candidate")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["id"], "USR0000001");
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["email_verified"], false);
    assert!(body["user"].get("password_hash").is_none());

    // unverified accounts cannot log in yet
    let err = login(
        Extension(h.shared.clone()),
        Json(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let code = last_code(&h.mailer);
    let Json(verified) = verify_email(
        Extension(h.shared.clone()),
        Json(VerifyEmailRequest {
            email: "jane@example.com".to_string(),
            code,
        }),
    )
    .await
    .unwrap();
    assert!(verified.user.email_verified);
    assert!(!verified.is_admin);

    let Json(session) = login(
        Extension(h.shared.clone()),
        Json(LoginRequest {
            email: "JANE@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        }),
    )
    .await
    .unwrap();

    let decoded = decode::<Claims>(
        &session.token,
        &DecodingKey::from_secret("test_secret".as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();
    assert_eq!(decoded.claims.sub, "USR0000001");
    assert_eq!(decoded.claims.role, Role::Candidate);

    let authed = authed_from_token(&h.shared, &session.token).await.unwrap();
    assert_eq!(authed.id, "USR0000001");
    assert_eq!(authed.role, Role::Candidate);

    let Json(me) = me_handler(Extension(h.shared.clone()), authed).await.unwrap();
    assert_eq!(me["user"]["name"], "Jane Doe");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let h = harness().await;

    register(
        Extension(h.shared.clone()),
        Json(register_request("dup@example.com", "employer")),
    )
    .await
    .unwrap();

    let err = register(
        Extension(h.shared.clone()),
        Json(register_request("DUP@example.com", "candidate")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_sequential_user_ids() {
    let h = harness().await;

    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"].iter().enumerate() {
        let (_, Json(body)) = register(
            Extension(h.shared.clone()),
            Json(register_request(email, "candidate")),
        )
        .await
        .unwrap();
        assert_eq!(body["user"]["id"], format!("USR{:07}", i + 1));
    }
}

#[tokio::test]
async fn test_wrong_code_and_wrong_password() {
    let h = harness().await;

    register(
        Extension(h.shared.clone()),
        Json(register_request("sam@example.com", "employer")),
    )
    .await
    .unwrap();

    let code = last_code(&h.mailer);
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let err = verify_email(
        Extension(h.shared.clone()),
        Json(VerifyEmailRequest {
            email: "sam@example.com".to_string(),
            code: wrong.to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    verify_email(
        Extension(h.shared.clone()),
        Json(VerifyEmailRequest {
            email: "sam@example.com".to_string(),
            code,
        }),
    )
    .await
    .unwrap();

    let err = login(
        Extension(h.shared.clone()),
        Json(LoginRequest {
            email: "sam@example.com".to_string(),
            password: "not-the-password".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
}

#[tokio::test]
async fn test_resend_answers_generically() {
    let h = harness().await;

    register(
        Extension(h.shared.clone()),
        Json(register_request("kim@example.com", "candidate")),
    )
    .await
    .unwrap();

    let resend = |email: &str| {
        resend_otp(
            Extension(h.shared.clone()),
            Json(ResendOtpRequest {
                email: email.to_string(),
            }),
        )
    };

    // the registration code was issued moments ago: no new mail, but the
    // answer matches the one for unknown addresses
    let sent_before = h.mailer.messages().len();
    let Json(pending) = resend("kim@example.com").await.unwrap();
    assert_eq!(h.mailer.messages().len(), sent_before);

    let Json(unknown) = resend("nobody@example.com").await.unwrap();
    assert_eq!(h.mailer.messages().len(), sent_before);
    assert_eq!(pending, unknown);
}

#[tokio::test]
async fn test_extractor_rejects_bad_tokens() {
    let h = harness().await;

    let err = authed_from_token(&h.shared, "garbage").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    let request = Request::builder().extension(h.shared.clone()).body(()).unwrap();
    let (mut parts, _) = request.into_parts();
    let err = AuthedUser::from_request_parts(&mut parts, &()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
}

#[tokio::test]
async fn test_admin_email_grants_admin() {
    let h = harness().await;

    register(
        Extension(h.shared.clone()),
        Json(register_request("admin@example.com", "employer")),
    )
    .await
    .unwrap();
    let code = last_code(&h.mailer);

    let Json(session) = verify_email(
        Extension(h.shared.clone()),
        Json(VerifyEmailRequest {
            email: "admin@example.com".to_string(),
            code,
        }),
    )
    .await
    .unwrap();
    assert!(session.is_admin);

    let authed = authed_from_token(&h.shared, &session.token).await.unwrap();
    assert!(authed.is_admin);
    assert!(authed.require_admin().is_ok());
    assert!(authed.require_employer().is_ok());
    assert!(authed.require_candidate().is_err());
}
