// src/candidates/handlers/mod.rs

pub mod applications;
pub mod interviews;

// Re-export handler functions
pub use applications::*;
pub use interviews::*;
