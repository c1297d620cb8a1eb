// src/jobs/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};
use std::collections::HashSet;

pub const MAX_QUESTIONS_PER_SET: usize = 50;

// ============================================================================
// Job Validators
// ============================================================================

pub struct JobValidator;

impl Validator<CreateJob> for JobValidator {
    fn validate(&self, data: &CreateJob) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.title.trim().is_empty() {
            result.add_error("title", "Job title is required");
        } else if data.title.len() > 255 {
            result.add_error("title", "Job title must be less than 255 characters");
        }

        if let Some(description) = &data.description {
            if description.len() > 10000 {
                result.add_error(
                    "description",
                    "Description must be less than 10000 characters",
                );
            }
        }

        if let Some(location) = &data.location {
            if location.len() > 255 {
                result.add_error("location", "Location must be less than 255 characters");
            }
        }

        if data.salary_min.is_some_and(|min| min < 0) {
            result.add_error("salary_min", "Minimum salary cannot be negative");
        }
        if data.salary_max.is_some_and(|max| max < 0) {
            result.add_error("salary_max", "Maximum salary cannot be negative");
        }
        if let (Some(min), Some(max)) = (data.salary_min, data.salary_max) {
            if min > max {
                result.add_error(
                    "salary_range",
                    "Minimum salary cannot be greater than maximum salary",
                );
            }
        }

        if let Some(job_type) = &data.job_type {
            let valid_types = HashSet::from([
                "full-time",
                "part-time",
                "contract",
                "temporary",
                "internship",
            ]);
            if !valid_types.contains(job_type.as_str()) {
                result.add_error("job_type", "Invalid job type");
            }
        }

        // new postings start as a draft or go straight live
        if let Some(status) = &data.status {
            if !matches!(status.as_str(), "draft" | "open") {
                result.add_error("status", "New jobs must be 'draft' or 'open'");
            }
        }

        result
    }
}

// ============================================================================
// Question Set Validators
// ============================================================================

pub struct QuestionSetValidator;

impl Validator<CreateQuestionSetRequest> for QuestionSetValidator {
    fn validate(&self, data: &CreateQuestionSetRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.name.trim().is_empty() {
            result.add_error("name", "Question set name is required");
        } else if data.name.len() > 255 {
            result.add_error("name", "Name must be less than 255 characters");
        }

        if data.questions.is_empty() {
            result.add_error("questions", "At least one question is required");
        } else if data.questions.len() > MAX_QUESTIONS_PER_SET {
            result.add_error("questions", "A question set holds at most 50 questions");
        }

        for (index, question) in data.questions.iter().enumerate() {
            let field = format!("questions[{}]", index);

            if question.prompt.trim().is_empty() {
                result.add_error(&field, "Question prompt is required");
            } else if question.prompt.len() > 1000 {
                result.add_error(&field, "Prompt must be less than 1000 characters");
            }

            match question.kind.parse::<QuestionKind>() {
                Ok(QuestionKind::Choice) => {
                    let distinct: HashSet<&str> =
                        question.options.iter().map(|o| o.trim()).collect();
                    if question.options.len() < 2 {
                        result.add_error(&field, "Choice questions need at least two options");
                    } else if distinct.len() != question.options.len() || distinct.contains("") {
                        result.add_error(&field, "Choice options must be distinct and non-empty");
                    }
                }
                Ok(_) => {
                    if !question.options.is_empty() {
                        result.add_error(&field, "Only choice questions take options");
                    }
                }
                Err(e) => result.add_error(&field, &e),
            }
        }

        result
    }
}
