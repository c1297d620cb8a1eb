// src/candidates/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};
use crate::jobs::models::{Question, QuestionKind};
use std::collections::HashMap;

// ============================================================================
// Application Validators
// ============================================================================

pub struct ApplicationValidator;

impl Validator<CreateApplicationRequest> for ApplicationValidator {
    fn validate(&self, data: &CreateApplicationRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.job_id.trim().is_empty() {
            result.add_error("job_id", "Job ID is required");
        }

        if let Some(cover_letter) = &data.cover_letter {
            if cover_letter.len() > 5000 {
                result.add_error(
                    "cover_letter",
                    "Cover letter must be less than 5000 characters",
                );
            }
        }

        for (question_id, answer) in &data.answers {
            if answer.len() > 2000 {
                result.add_error(
                    &format!("answers.{}", question_id),
                    "Answer must be less than 2000 characters",
                );
            }
        }

        result
    }
}

/// Check screening answers against the job's questions
pub fn validate_answers(
    questions: &[Question],
    answers: &HashMap<String, String>,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    for question in questions {
        let field = format!("answers.{}", question.id);
        let answer = answers
            .get(&question.id)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty());

        let Some(answer) = answer else {
            if question.required {
                result.add_error(&field, "This question requires an answer");
            }
            continue;
        };

        match question.kind {
            QuestionKind::Text => {}
            QuestionKind::YesNo => {
                if !matches!(answer, "yes" | "no") {
                    result.add_error(&field, "Answer must be 'yes' or 'no'");
                }
            }
            QuestionKind::Choice => {
                if !question.options.iter().any(|o| o == answer) {
                    result.add_error(&field, "Answer must be one of the listed options");
                }
            }
        }
    }

    for question_id in answers.keys() {
        if !questions.iter().any(|q| &q.id == question_id) {
            result.add_error(
                &format!("answers.{}", question_id),
                "Unknown question for this job",
            );
        }
    }

    result
}

// ============================================================================
// Interview Validators
// ============================================================================

pub struct InterviewValidator;

impl Validator<CreateInterviewRequest> for InterviewValidator {
    fn validate(&self, data: &CreateInterviewRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.application_id.trim().is_empty() {
            result.add_error("application_id", "Application ID is required");
        }

        if !matches!(data.mode.trim(), "online" | "onsite" | "phone") {
            result.add_error("mode", "Mode must be 'online', 'onsite' or 'phone'");
        }

        if data.mode.trim() == "onsite" && data.location.as_deref().map_or(true, |l| l.trim().is_empty()) {
            result.add_error("location", "Onsite interviews need a location");
        }

        if data.location.as_ref().is_some_and(|l| l.len() > 500) {
            result.add_error("location", "Location must be less than 500 characters");
        }

        if data.notes.as_ref().is_some_and(|n| n.len() > 2000) {
            result.add_error("notes", "Notes must be less than 2000 characters");
        }

        result
    }
}
