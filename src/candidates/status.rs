// src/candidates/status.rs
//! Application and interview status tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Reviewed,
    Shortlisted,
    InterviewScheduled,
    Interviewed,
    Offered,
    Hired,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 9] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Interviewed,
        ApplicationStatus::Offered,
        ApplicationStatus::Hired,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::Interviewed => "interviewed",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Position in the hiring pipeline; `None` for the exits
    pub fn order(&self) -> Option<u8> {
        match self {
            ApplicationStatus::Submitted => Some(0),
            ApplicationStatus::Reviewed => Some(1),
            ApplicationStatus::Shortlisted => Some(2),
            ApplicationStatus::InterviewScheduled => Some(3),
            ApplicationStatus::Interviewed => Some(4),
            ApplicationStatus::Offered => Some(5),
            ApplicationStatus::Hired => Some(6),
            ApplicationStatus::Rejected | ApplicationStatus::Withdrawn => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Hired | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    pub fn next(&self) -> Option<ApplicationStatus> {
        let order = self.order()?;
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|s| s.order() == Some(order + 1))
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid application status: {}", s))
    }
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    Candidate,
    Employer,
}

/// Check if a status transition is valid
///
/// Candidates may only withdraw. Employers move applications forward (skips
/// allowed, never backward) or reject them. Final statuses do not change.
pub fn validate_status_transition(
    current: ApplicationStatus,
    new: ApplicationStatus,
    actor: StatusActor,
) -> Result<(), String> {
    if current == new {
        return Ok(());
    }

    if current.is_final() {
        return Err(format!(
            "Cannot change status from '{}' to '{}'",
            current, new
        ));
    }

    match (actor, new) {
        (StatusActor::Candidate, ApplicationStatus::Withdrawn) => Ok(()),
        (StatusActor::Candidate, _) => {
            Err("Candidates can only withdraw their applications".to_string())
        }
        (StatusActor::Employer, ApplicationStatus::Withdrawn) => {
            Err("Only the candidate can withdraw an application".to_string())
        }
        (StatusActor::Employer, ApplicationStatus::Rejected) => Ok(()),
        (StatusActor::Employer, _) => {
            // both have an order here: neither is an exit status
            match (current.order(), new.order()) {
                (Some(from), Some(to)) if to > from => Ok(()),
                _ => Err(format!(
                    "Invalid status transition from '{}' to '{}'. Status can only move forward.",
                    current, new
                )),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Rescheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Rescheduled => "rescheduled",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::NoShow => "no_show",
        }
    }

    /// Terminal interviews no longer hold their time slot
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterviewStatus::Completed | InterviewStatus::Cancelled | InterviewStatus::NoShow
        )
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(InterviewStatus::Scheduled),
            "rescheduled" => Ok(InterviewStatus::Rescheduled),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            "no_show" => Ok(InterviewStatus::NoShow),
            other => Err(format!("Invalid interview status: {}", other)),
        }
    }
}

/// SQL list of the statuses that still hold a slot, for `status IN (...)`
pub const ACTIVE_INTERVIEW_STATUSES_SQL: &str = "'scheduled', 'rescheduled'";
