// src/candidates/tests.rs

use crate::candidates::models::*;
use crate::candidates::status::*;
use crate::candidates::validators::*;
use crate::common::Validator;
use crate::jobs::models::{Question, QuestionKind};
use std::collections::HashMap;

fn question(id: &str, kind: QuestionKind, required: bool, options: &[&str]) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("Prompt {}", id),
        kind,
        options: options.iter().map(|o| o.to_string()).collect(),
        required,
        position: 0,
    }
}

fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect()
}

#[test]
fn test_application_validator_valid_request() {
    let request = CreateApplicationRequest {
        job_id: "JOB0000001".to_string(),
        cover_letter: Some("Test cover letter".to_string()),
        answers: HashMap::new(),
    };

    let result = ApplicationValidator.validate(&request);
    assert!(result.is_valid);
    assert_eq!(result.errors.len(), 0);
}

#[test]
fn test_application_validator_rejects_long_fields() {
    let long_answer = "b".repeat(2001);
    let request = CreateApplicationRequest {
        job_id: " ".to_string(),
        cover_letter: Some("a".repeat(5001)),
        answers: answers(&[("QUE0000001", long_answer.as_str())]),
    };

    let result = ApplicationValidator.validate(&request);
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 3);
}

#[test]
fn test_answers_against_questions() {
    let questions = vec![
        question("QUE0000001", QuestionKind::YesNo, true, &[]),
        question("QUE0000002", QuestionKind::Choice, false, &["remote", "office"]),
        question("QUE0000003", QuestionKind::Text, false, &[]),
    ];

    assert!(validate_answers(&questions, &answers(&[("QUE0000001", "yes")])).is_valid);
    assert!(validate_answers(
        &questions,
        &answers(&[("QUE0000001", "no"), ("QUE0000002", "office"), ("QUE0000003", "hi")])
    )
    .is_valid);

    // blank counts as unanswered
    assert!(!validate_answers(&questions, &answers(&[("QUE0000001", "  ")])).is_valid);
    assert!(!validate_answers(&questions, &answers(&[("QUE0000001", "maybe")])).is_valid);
    assert!(!validate_answers(
        &questions,
        &answers(&[("QUE0000001", "yes"), ("QUE0000002", "moon")])
    )
    .is_valid);
    assert!(!validate_answers(
        &questions,
        &answers(&[("QUE0000001", "yes"), ("QUE0000099", "stray")])
    )
    .is_valid);
}

#[test]
fn test_no_questions_means_no_answers() {
    assert!(validate_answers(&[], &HashMap::new()).is_valid);
    assert!(!validate_answers(&[], &answers(&[("QUE0000001", "yes")])).is_valid);
}

#[test]
fn test_interview_validator() {
    let mut request = CreateInterviewRequest {
        application_id: "APP0000001".to_string(),
        start_at: "2030-01-01T10:00:00Z".to_string(),
        end_at: "2030-01-01T11:00:00Z".to_string(),
        mode: "online".to_string(),
        location: None,
        notes: None,
    };
    assert!(InterviewValidator.validate(&request).is_valid);

    request.mode = "onsite".to_string();
    assert!(!InterviewValidator.validate(&request).is_valid);

    request.location = Some("HQ".to_string());
    assert!(InterviewValidator.validate(&request).is_valid);

    request.mode = "carrier pigeon".to_string();
    assert!(!InterviewValidator.validate(&request).is_valid);
}

#[test]
fn test_employer_moves_forward_with_skips() {
    use ApplicationStatus::*;

    assert!(validate_status_transition(Submitted, Reviewed, StatusActor::Employer).is_ok());
    assert!(validate_status_transition(Submitted, Offered, StatusActor::Employer).is_ok());
    assert!(validate_status_transition(Offered, Hired, StatusActor::Employer).is_ok());
    assert!(validate_status_transition(Interviewed, Shortlisted, StatusActor::Employer).is_err());
    assert!(validate_status_transition(Reviewed, Withdrawn, StatusActor::Employer).is_err());
}

#[test]
fn test_rejection_from_any_open_status() {
    for status in ApplicationStatus::ALL {
        let result = validate_status_transition(status, ApplicationStatus::Rejected, StatusActor::Employer);
        if status.is_final() && status != ApplicationStatus::Rejected {
            assert!(result.is_err(), "{} -> rejected should fail", status);
        } else {
            assert!(result.is_ok(), "{} -> rejected should pass", status);
        }
    }
}

#[test]
fn test_candidate_may_only_withdraw() {
    use ApplicationStatus::*;

    assert!(validate_status_transition(Shortlisted, Withdrawn, StatusActor::Candidate).is_ok());
    assert!(validate_status_transition(Submitted, Reviewed, StatusActor::Candidate).is_err());
    assert!(validate_status_transition(Hired, Withdrawn, StatusActor::Candidate).is_err());
}

#[test]
fn test_final_statuses_are_sticky() {
    use ApplicationStatus::*;

    for from in [Hired, Rejected, Withdrawn] {
        for to in ApplicationStatus::ALL {
            let result = validate_status_transition(from, to, StatusActor::Employer);
            assert_eq!(result.is_ok(), from == to, "{} -> {}", from, to);
        }
    }
}

#[test]
fn test_status_round_trip_and_next() {
    for status in ApplicationStatus::ALL {
        assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
    }
    assert_eq!(ApplicationStatus::Submitted.next(), Some(ApplicationStatus::Reviewed));
    assert_eq!(ApplicationStatus::Offered.next(), Some(ApplicationStatus::Hired));
    assert_eq!(ApplicationStatus::Hired.next(), None);
    assert_eq!(ApplicationStatus::Rejected.next(), None);
    assert!("archived".parse::<ApplicationStatus>().is_err());
}

#[test]
fn test_interview_terminal_statuses() {
    assert!(!InterviewStatus::Scheduled.is_terminal());
    assert!(!InterviewStatus::Rescheduled.is_terminal());
    assert!(InterviewStatus::Completed.is_terminal());
    assert!(InterviewStatus::Cancelled.is_terminal());
    assert!(InterviewStatus::NoShow.is_terminal());
    assert_eq!("no_show".parse::<InterviewStatus>().unwrap(), InterviewStatus::NoShow);
}
