//! Request validation for account endpoints

use super::models::{RegisterRequest, Role};
use crate::common::validation::is_valid_email;
use crate::common::{ValidationResult, Validator};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_valid_email(data.email.trim()) {
            result.add_error("email", "A valid email address is required");
        }

        if data.name.trim().is_empty() {
            result.add_error("name", "Name is required");
        } else if data.name.len() > 255 {
            result.add_error("name", "Name must be less than 255 characters");
        }

        let password_len = data.password.chars().count();
        if password_len < MIN_PASSWORD_LEN {
            result.add_error("password", "Password must be at least 8 characters");
        } else if password_len > MAX_PASSWORD_LEN {
            result.add_error("password", "Password must be at most 128 characters");
        }

        // admins are granted through ADMIN_EMAILS, never self-registered
        match data.role.parse::<Role>() {
            Ok(Role::Candidate) | Ok(Role::Employer) => {}
            _ => result.add_error("role", "Role must be 'candidate' or 'employer'"),
        }

        result
    }
}
