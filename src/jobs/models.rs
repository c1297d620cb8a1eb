// src/jobs/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Job Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Job {
    pub id: String,
    pub employer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub question_set_id: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Draft,
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
        }
    }

    /// draft -> open -> closed, or straight from draft to closed
    pub fn can_move_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Draft, JobStatus::Open)
                | (JobStatus::Draft, JobStatus::Closed)
                | (JobStatus::Open, JobStatus::Closed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JobStatus::Draft),
            "open" => Ok(JobStatus::Open),
            "closed" => Ok(JobStatus::Closed),
            other => Err(format!("Invalid job status: {}", other)),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateJob {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub question_set_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateJobStatusRequest {
    pub status: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct JobQueryParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub location: Option<String>,
}

// Paginated job list response
#[derive(Serialize, Debug)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

// ============================================================================
// Question Set Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct QuestionSet {
    pub id: String,
    pub employer_id: String,
    pub name: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    YesNo,
    Choice,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::YesNo => "yes_no",
            QuestionKind::Choice => "choice",
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(QuestionKind::Text),
            "yes_no" => Ok(QuestionKind::YesNo),
            "choice" => Ok(QuestionKind::Choice),
            other => Err(format!("Invalid question kind: {}", other)),
        }
    }
}

/// Question row; `options` is a JSON array for `choice` questions
#[derive(FromRow, Debug, Clone)]
pub struct QuestionRow {
    pub id: String,
    pub question_set_id: String,
    pub prompt: String,
    pub kind: String,
    pub options: Option<String>,
    pub required: bool,
    pub position: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub required: bool,
    pub position: i64,
}

impl TryFrom<QuestionRow> for Question {
    type Error = String;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let options = match row.options {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw)
                .map_err(|e| format!("Corrupt options for question {}: {}", row.id, e))?,
            None => Vec::new(),
        };

        Ok(Question {
            kind: row.kind.parse()?,
            id: row.id,
            prompt: row.prompt,
            options,
            required: row.required,
            position: row.position,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateQuestion {
    pub prompt: String,
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateQuestionSetRequest {
    pub name: String,
    pub questions: Vec<CreateQuestion>,
}

#[derive(Serialize, Debug)]
pub struct QuestionSetWithQuestions {
    #[serde(flatten)]
    pub set: QuestionSet,
    pub questions: Vec<Question>,
}
