// src/services/mod.rs
//
// Shared services module containing business logic services
// that can be used across different domain modules

pub mod applications;
pub mod email;
pub mod interviews;
pub mod otp;
pub mod scheduling;

// Re-export commonly used types for convenience
pub use email::{LogMailer, Mailer};
pub use otp::OtpService;
