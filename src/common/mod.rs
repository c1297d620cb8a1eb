// Common module - shared types and utilities across all modules

pub mod config;
pub mod dev_mode;
pub mod error;
pub mod helpers;
pub mod id_generator;
pub mod migrations;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use helpers::{format_timestamp, now_timestamp, parse_timestamp, safe_email_log};
pub use id_generator::{next_entity_id, EntityPrefix, IdAllocator};
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};
