// src/candidates/handlers/applications.rs

use crate::auth::AuthedUser;
use crate::candidates::models::*;
use crate::common::{ApiError, AppState};
use crate::services::applications;
use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use std::sync::Arc;
use tokio::sync::RwLock;

/// POST /api/applications - Apply to an open job
pub async fn create_application(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    authed.require_candidate()?;
    let state = state_lock.read().await.clone();

    let application = applications::create_application(&state, &authed, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/applications - The caller's own applications
pub async fn get_user_applications(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Application>>, ApiError> {
    let state = state_lock.read().await.clone();
    let list = applications::list_candidate_applications(&state.db, &authed.id).await?;
    Ok(Json(list))
}

/// GET /api/applications/:id
pub async fn get_application_details(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<ApplicationWithDetails>, ApiError> {
    let state = state_lock.read().await.clone();
    let details = applications::get_application_details(&state, &authed, &id).await?;
    Ok(Json(details))
}

/// PATCH /api/applications/:id/status
pub async fn update_application_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateApplicationStatusRequest>,
) -> Result<Json<Application>, ApiError> {
    let state = state_lock.read().await.clone();
    let updated = applications::update_application_status(&state, &authed, &id, request).await?;
    Ok(Json(updated))
}

/// GET /api/employer/jobs/:id/applications
pub async fn get_job_applications(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<ApplicationWithDetails>>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();
    let list = applications::list_job_applications(&state, &authed, &job_id).await?;
    Ok(Json(list))
}
