// src/admin/models.rs

use serde::Serialize;
use std::collections::BTreeMap;

// Dashboard models
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_users: i64,
    pub total_jobs: i64,
    pub total_applications: i64,
    pub upcoming_interviews: i64,
    pub last_updated: String,

    // Breakdowns for charts
    pub users_by_role: BTreeMap<String, i64>,
    pub jobs_by_status: BTreeMap<String, i64>,
    pub applications_by_status: BTreeMap<String, i64>,
}
