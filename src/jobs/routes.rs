// src/jobs/routes.rs

use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers;

/// Create the jobs router with all job-related routes
pub fn jobs_routes() -> Router {
    Router::new()
        // Public routes
        .route("/api/jobs", get(handlers::list_open_jobs))
        .route("/api/jobs/:id", get(handlers::get_job_by_id))
        // Employer job management
        .route(
            "/api/employer/jobs",
            get(handlers::list_employer_jobs).post(handlers::create_job),
        )
        .route(
            "/api/employer/jobs/:id/status",
            patch(handlers::update_job_status),
        )
        // Screening question sets
        .route(
            "/api/employer/question-sets",
            get(handlers::list_question_sets).post(handlers::create_question_set),
        )
        .route(
            "/api/employer/question-sets/:id",
            get(handlers::get_question_set),
        )
}
