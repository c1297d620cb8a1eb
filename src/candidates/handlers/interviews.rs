// src/candidates/handlers/interviews.rs

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthedUser;
use crate::candidates::models::*;
use crate::candidates::status::InterviewStatus;
use crate::common::{ApiError, AppState};
use crate::services::interviews;

/// POST /api/employer/interviews - Schedule an interview
pub async fn schedule_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(body): Json<CreateInterviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    info!(
        employer_id = %authed.id,
        application_id = %body.application_id,
        "Employer scheduling interview"
    );

    let interview = interviews::schedule_interview(&state, &authed, body).await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

/// PUT /api/employer/interviews/:id - Move an interview to a new slot
pub async fn reschedule_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
    Json(body): Json<RescheduleInterviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let interview = interviews::reschedule_interview(&state, &authed, &id, body).await?;
    Ok(Json(interview))
}

async fn close_with(
    state_lock: Arc<RwLock<AppState>>,
    authed: AuthedUser,
    id: String,
    status: InterviewStatus,
) -> Result<Json<Interview>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let interview = interviews::close_interview(&state, &authed, &id, status).await?;
    Ok(Json(interview))
}

/// POST /api/employer/interviews/:id/cancel
pub async fn cancel_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    close_with(state_lock, authed, id, InterviewStatus::Cancelled).await
}

/// POST /api/employer/interviews/:id/complete
pub async fn complete_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    close_with(state_lock, authed, id, InterviewStatus::Completed).await
}

/// POST /api/employer/interviews/:id/no-show
pub async fn mark_no_show(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    close_with(state_lock, authed, id, InterviewStatus::NoShow).await
}

/// POST /api/employer/interviews/check - Check a slot without booking it
pub async fn check_availability(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(body): Json<AvailabilityCheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let range = interviews::parse_range(&body.start_at, &body.end_at)?;
    let result =
        interviews::check_availability(&state.db, &authed.id, &range, body.exclude_id.as_deref())
            .await?;
    Ok(Json(result))
}

/// GET /api/employer/interviews?from&to - Employer calendar
pub async fn list_employer_interviews(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(params): Query<InterviewListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let list = interviews::list_employer_interviews(
        &state.db,
        &authed.id,
        params.from.as_deref(),
        params.to.as_deref(),
    )
    .await?;
    Ok(Json(list))
}

/// GET /api/employer/interviews/:id
pub async fn get_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let interview = interviews::get_interview(&state.db, &id).await?;
    if interview.employer_id != authed.id && interview.candidate_id != authed.id && !authed.is_admin {
        return Err(ApiError::Forbidden(
            "You cannot view this interview".to_string(),
        ));
    }
    Ok(Json(interview))
}

/// GET /api/interviews - The candidate's own interviews
pub async fn get_my_interviews(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let list = interviews::list_candidate_interviews(&state.db, &authed.id).await?;
    Ok(Json(list))
}
