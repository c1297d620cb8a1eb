// src/candidates/routes.rs

use crate::candidates::handlers;
use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub fn candidates_routes() -> Router {
    Router::new()
        // Application routes
        .route(
            "/api/applications",
            post(handlers::create_application).get(handlers::get_user_applications),
        )
        .route(
            "/api/applications/:id",
            get(handlers::get_application_details),
        )
        .route(
            "/api/applications/:id/status",
            patch(handlers::update_application_status),
        )
        .route(
            "/api/employer/jobs/:id/applications",
            get(handlers::get_job_applications),
        )
        // Interview routes
        .route(
            "/api/employer/interviews",
            get(handlers::list_employer_interviews).post(handlers::schedule_interview),
        )
        .route(
            "/api/employer/interviews/check",
            post(handlers::check_availability),
        )
        .route(
            "/api/employer/interviews/:id",
            put(handlers::reschedule_interview).get(handlers::get_interview),
        )
        .route(
            "/api/employer/interviews/:id/cancel",
            post(handlers::cancel_interview),
        )
        .route(
            "/api/employer/interviews/:id/complete",
            post(handlers::complete_interview),
        )
        .route(
            "/api/employer/interviews/:id/no-show",
            post(handlers::mark_no_show),
        )
        .route("/api/interviews", get(handlers::get_my_interviews))
}
