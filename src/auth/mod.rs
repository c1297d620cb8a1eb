//! # Auth Module
//!
//! Accounts and sessions:
//! - registration with emailed verification codes
//! - password login and JWT issuing
//! - the AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
