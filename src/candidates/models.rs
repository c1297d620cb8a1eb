// src/candidates/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

// ============================================================================
// Application Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub candidate_id: String,
    pub status: String,
    pub cover_letter: Option<String>,
    /// JSON object question_id -> answer
    #[serde(skip_serializing)]
    pub answers: String,
    pub applied_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationStatusHistory {
    pub id: String,
    pub application_id: String,
    pub from_status: Option<String>,
    pub status: String,
    pub changed_by: String,
    pub notes: Option<String>,
    pub changed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub job_id: String,
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationWithDetails {
    #[serde(flatten)]
    pub application: Application,
    pub answers: HashMap<String, String>,
    pub job_title: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub status_history: Vec<ApplicationStatusHistory>,
}

// ============================================================================
// Interview Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: String,
    pub application_id: String,
    pub employer_id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub start_at: String,
    pub end_at: String,
    pub mode: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub application_id: String,
    pub start_at: String,
    pub end_at: String,
    pub mode: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleInterviewRequest {
    pub start_at: String,
    pub end_at: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityCheckRequest {
    pub start_at: String,
    pub end_at: String,
    pub exclude_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AvailabilityCheckResponse {
    pub conflict: bool,
    pub conflicting_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InterviewWithDetails {
    #[serde(flatten)]
    pub interview: Interview,
    pub candidate_name: String,
    pub job_title: String,
}
