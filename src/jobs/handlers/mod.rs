// src/jobs/handlers/mod.rs

pub mod postings;
pub mod question_sets;

pub use postings::*;
pub use question_sets::{create_question_set, get_question_set, list_question_sets};
