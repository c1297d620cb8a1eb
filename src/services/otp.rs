// src/services/otp.rs
//! In-memory store for email verification codes
//!
//! One entry per email address. Issuing is throttled twice: a short cooldown
//! between consecutive codes and a cap on codes per send window. A background
//! task sweeps entries that are both expired and outside their send window.

use rand::Rng;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::common::{safe_email_log, ApiError};

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub ttl: Duration,
    pub resend_cooldown: Duration,
    pub max_sends: u32,
    pub send_window: Duration,
    pub max_attempts: u32,
    pub cleanup_interval: Duration,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),            // codes live 5 minutes
            resend_cooldown: Duration::from_secs(60), // one code per minute
            max_sends: 5,                             // 5 codes per window
            send_window: Duration::from_secs(3600),   // 1 hour window
            max_attempts: 5,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}

impl OtpConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_u64("OTP_TTL_SECONDS").filter(|s| *s > 0) {
            config.ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env_u64("OTP_RESEND_COOLDOWN_SECONDS") {
            config.resend_cooldown = Duration::from_secs(secs);
        }

        if let Some(max) = env_u64("OTP_MAX_SENDS").filter(|m| *m > 0) {
            config.max_sends = max as u32;
        }

        if let Some(secs) = env_u64("OTP_SEND_WINDOW_SECONDS").filter(|s| *s > 0) {
            config.send_window = Duration::from_secs(secs);
        }

        if let Some(max) = env_u64("OTP_MAX_ATTEMPTS").filter(|m| *m > 0) {
            config.max_attempts = max as u32;
        }

        if let Some(secs) = env_u64("OTP_CLEANUP_INTERVAL_SECONDS").filter(|s| *s > 0) {
            config.cleanup_interval = Duration::from_secs(secs);
        }

        config
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("please wait {retry_after} seconds before requesting another code")]
    Cooldown { retry_after: u64 },
    #[error("too many codes requested, try again in {retry_after} seconds")]
    SendLimit { retry_after: u64 },
    #[error("no verification code was requested for this email")]
    NotFound,
    #[error("verification code has expired")]
    Expired,
    #[error("verification code is incorrect ({remaining_attempts} attempts left)")]
    Mismatch { remaining_attempts: u32 },
    #[error("too many incorrect attempts, request a new code")]
    TooManyAttempts,
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::Cooldown { retry_after } | OtpError::SendLimit { retry_after } => {
                ApiError::TooManyRequests {
                    message: e.to_string(),
                    retry_after,
                }
            }
            OtpError::NotFound
            | OtpError::Expired
            | OtpError::Mismatch { .. }
            | OtpError::TooManyAttempts => ApiError::BadRequest(e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    issued_at: Instant,
    expires_at: Instant,
    attempts: u32,
    locked: bool,
    window_start: Instant,
    sends_in_window: u32,
}

impl OtpEntry {
    fn new(code: String, now: Instant, ttl: Duration) -> Self {
        Self {
            code,
            issued_at: now,
            expires_at: now + ttl,
            attempts: 0,
            locked: false,
            window_start: now,
            sends_in_window: 1,
        }
    }

    fn is_stale(&self, now: Instant, send_window: Duration) -> bool {
        now >= self.expires_at && now >= self.window_start + send_window
    }
}

/// Whole seconds until `deadline`, rounded up and never zero
fn seconds_until(deadline: Instant, now: Instant) -> u64 {
    let remaining = deadline.saturating_duration_since(now);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_LENGTH)
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug)]
pub struct OtpService {
    config: OtpConfig,
    store: RwLock<HashMap<String, OtpEntry>>,
}

impl OtpService {
    pub fn new(config: OtpConfig) -> Self {
        info!(
            ttl_seconds = config.ttl.as_secs(),
            resend_cooldown_seconds = config.resend_cooldown.as_secs(),
            max_sends = config.max_sends,
            send_window_seconds = config.send_window.as_secs(),
            max_attempts = config.max_attempts,
            "Initializing OtpService"
        );
        Self {
            config,
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issue a fresh code for `email`, replacing any previous one
    pub async fn issue(&self, email: &str) -> Result<String, OtpError> {
        self.issue_code_at(email, generate_code(), Instant::now())
            .await
    }

    async fn issue_code_at(
        &self,
        email: &str,
        code: String,
        now: Instant,
    ) -> Result<String, OtpError> {
        let key = normalize(email);
        let mut store = self.store.write().await;

        match store.get_mut(&key) {
            Some(entry) => {
                let cooldown_end = entry.issued_at + self.config.resend_cooldown;
                if now < cooldown_end {
                    return Err(OtpError::Cooldown {
                        retry_after: seconds_until(cooldown_end, now),
                    });
                }

                let window_end = entry.window_start + self.config.send_window;
                if now >= window_end {
                    entry.window_start = now;
                    entry.sends_in_window = 0;
                } else if entry.sends_in_window >= self.config.max_sends {
                    warn!(email = %safe_email_log(&key), "OTP send limit reached");
                    return Err(OtpError::SendLimit {
                        retry_after: seconds_until(window_end, now),
                    });
                }

                entry.code = code.clone();
                entry.issued_at = now;
                entry.expires_at = now + self.config.ttl;
                entry.attempts = 0;
                entry.locked = false;
                entry.sends_in_window += 1;
            }
            None => {
                store.insert(key.clone(), OtpEntry::new(code.clone(), now, self.config.ttl));
            }
        }

        debug!(email = %safe_email_log(&key), "Issued verification code");
        Ok(code)
    }

    /// Check `code` for `email`; a match consumes the code
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), OtpError> {
        self.verify_at(email, code, Instant::now()).await
    }

    async fn verify_at(&self, email: &str, code: &str, now: Instant) -> Result<(), OtpError> {
        let key = normalize(email);
        let mut store = self.store.write().await;

        let entry = store.get_mut(&key).ok_or(OtpError::NotFound)?;

        if entry.locked {
            return Err(OtpError::TooManyAttempts);
        }

        if now >= entry.expires_at {
            return Err(OtpError::Expired);
        }

        if entry.code != code.trim() {
            entry.attempts += 1;
            if entry.attempts >= self.config.max_attempts {
                entry.locked = true;
                warn!(email = %safe_email_log(&key), "Verification code locked after failed attempts");
                return Err(OtpError::TooManyAttempts);
            }
            return Err(OtpError::Mismatch {
                remaining_attempts: self.config.max_attempts - entry.attempts,
            });
        }

        store.remove(&key);
        debug!(email = %safe_email_log(&key), "Verification code accepted");
        Ok(())
    }

    /// Drop entries that are expired and outside their send window
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now()).await
    }

    async fn cleanup_expired_at(&self, now: Instant) -> usize {
        let mut store = self.store.write().await;
        let before = store.len();
        let window = self.config.send_window;
        store.retain(|_, entry| !entry.is_stale(now, window));
        let removed = before - store.len();
        if removed > 0 {
            info!(removed = removed, "Cleaned up expired verification codes");
        }
        removed
    }

    /// Periodically sweep stale entries for the lifetime of the process
    pub fn start_cleanup_task(service: Arc<OtpService>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(service.config.cleanup_interval);
            loop {
                interval.tick().await;
                service.cleanup_expired().await;
            }
        });
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "Jane.Doe@Example.com";

    fn service() -> OtpService {
        OtpService::new(OtpConfig::default())
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_issue_then_verify_consumes_code() {
        let service = service();
        let code = service.issue(EMAIL).await.unwrap();

        // lookups are case-insensitive on the email
        service.verify("jane.doe@example.com", &code).await.unwrap();
        assert_eq!(service.verify(EMAIL, &code).await, Err(OtpError::NotFound));
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let service = service();
        let t0 = Instant::now();
        service.issue_code_at(EMAIL, "123456".into(), t0).await.unwrap();

        let later = t0 + service.config().ttl;
        assert_eq!(
            service.verify_at(EMAIL, "123456", later).await,
            Err(OtpError::Expired)
        );
    }

    #[tokio::test]
    async fn test_resend_cooldown() {
        let service = service();
        let t0 = Instant::now();
        service.issue_code_at(EMAIL, "111111".into(), t0).await.unwrap();

        let err = service
            .issue_code_at(EMAIL, "222222".into(), t0 + secs(20))
            .await
            .unwrap_err();
        assert_eq!(err, OtpError::Cooldown { retry_after: 40 });

        // after the cooldown the new code replaces the old one
        service
            .issue_code_at(EMAIL, "333333".into(), t0 + secs(60))
            .await
            .unwrap();
        assert!(matches!(
            service.verify_at(EMAIL, "111111", t0 + secs(61)).await,
            Err(OtpError::Mismatch { .. })
        ));
        service.verify_at(EMAIL, "333333", t0 + secs(62)).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_limit_per_window() {
        let service = service();
        let t0 = Instant::now();

        for i in 0..5u64 {
            service
                .issue_code_at(EMAIL, format!("00000{}", i), t0 + secs(i * 60))
                .await
                .unwrap();
        }

        let err = service
            .issue_code_at(EMAIL, "999999".into(), t0 + secs(5 * 60))
            .await
            .unwrap_err();
        assert_eq!(err, OtpError::SendLimit { retry_after: 3600 - 300 });

        // a new window opens once the first one has elapsed
        service
            .issue_code_at(EMAIL, "999999".into(), t0 + secs(3600))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attempts_lock_the_code() {
        let service = service();
        let t0 = Instant::now();
        service.issue_code_at(EMAIL, "424242".into(), t0).await.unwrap();

        for remaining in (1..5).rev() {
            assert_eq!(
                service.verify_at(EMAIL, "000000", t0 + secs(1)).await,
                Err(OtpError::Mismatch {
                    remaining_attempts: remaining
                })
            );
        }
        assert_eq!(
            service.verify_at(EMAIL, "000000", t0 + secs(1)).await,
            Err(OtpError::TooManyAttempts)
        );
        // even the right code is refused until a new one is issued
        assert_eq!(
            service.verify_at(EMAIL, "424242", t0 + secs(2)).await,
            Err(OtpError::TooManyAttempts)
        );

        service
            .issue_code_at(EMAIL, "515151".into(), t0 + secs(60))
            .await
            .unwrap();
        service.verify_at(EMAIL, "515151", t0 + secs(61)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_keeps_entries_inside_send_window() {
        let service = service();
        let t0 = Instant::now();
        service.issue_code_at("a@example.com", "111111".into(), t0).await.unwrap();
        service
            .issue_code_at("b@example.com", "222222".into(), t0 + secs(1800))
            .await
            .unwrap();

        // a's code expired but its send window is still open
        assert_eq!(service.cleanup_expired_at(t0 + secs(600)).await, 0);
        assert_eq!(service.len().await, 2);

        // a's window is over, b's is not
        assert_eq!(service.cleanup_expired_at(t0 + secs(3600)).await, 1);
        assert_eq!(service.len().await, 1);
        assert_eq!(
            service.verify_at("a@example.com", "111111", t0 + secs(3601)).await,
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_error_mapping() {
        match ApiError::from(OtpError::Cooldown { retry_after: 12 }) {
            ApiError::TooManyRequests { retry_after, .. } => assert_eq!(retry_after, 12),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            ApiError::from(OtpError::Expired),
            ApiError::BadRequest(_)
        ));
    }
}
