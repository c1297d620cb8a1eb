// src/jobs/handlers/postings.rs

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::question_sets::fetch_owned_set;
use crate::auth::AuthedUser;
use crate::common::{next_entity_id, now_timestamp, ApiError, AppState, EntityPrefix, Validator};
use crate::jobs::models::*;
use crate::jobs::validators::JobValidator;

async fn fetch_job(pool: &SqlitePool, id: &str) -> Result<Job, ApiError> {
    sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, job_id = %id, "Database error fetching job");
            ApiError::DatabaseError(e)
        })?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

/// GET /api/jobs - Open jobs, newest first, paginated
pub async fn list_open_jobs(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<JobQueryParams>,
) -> Result<Json<JobListResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1)
        .checked_mul(limit)
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(|| {
            warn!(page = page, limit = limit, "Job list page out of range");
            ApiError::BadRequest("page is out of range".to_string())
        })?;
    let location = params
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("%{}%", l));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM jobs WHERE status = 'open' AND (? IS NULL OR location LIKE ?)",
    )
    .bind(&location)
    .bind(&location)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let jobs = sqlx::query_as::<_, Job>(
        r#"
        SELECT * FROM jobs
        WHERE status = 'open' AND (? IS NULL OR location LIKE ?)
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&location)
    .bind(&location)
    .bind(limit as i64)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    debug!(
        job_count = jobs.len(),
        total = total,
        page = page,
        limit = limit,
        "Successfully loaded paginated jobs list"
    );

    Ok(Json(JobListResponse {
        jobs,
        total: total as usize,
        page,
        page_size: limit,
    }))
}

/// GET /api/jobs/:id - Open jobs only
pub async fn get_job_by_id(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let state = state_lock.read().await.clone();

    let job = fetch_job(&state.db, &id).await?;
    if job.status != JobStatus::Open.as_str() {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }

    Ok(Json(job))
}

/// POST /api/employer/jobs
pub async fn create_job(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<CreateJob>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let validation = JobValidator.validate(&payload);
    if !validation.is_valid {
        warn!(
            user_id = %authed.id,
            errors = ?validation.errors,
            "Job creation validation failed"
        );
        return Err(validation.into());
    }

    if let Some(set_id) = &payload.question_set_id {
        fetch_owned_set(&state.db, set_id, &authed).await?;
    }

    let status = payload.status.as_deref().unwrap_or("draft");

    let job_id = {
        let _lease = state.ids.lease().await;
        let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

        let job_id = next_entity_id(&mut tx, EntityPrefix::Job)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, employer_id, title, description, location, job_type,
                salary_min, salary_max, question_set_id, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job_id)
        .bind(&authed.id)
        .bind(payload.title.trim())
        .bind(&payload.description)
        .bind(&payload.location)
        .bind(&payload.job_type)
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(&payload.question_set_id)
        .bind(status)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error creating job");
            ApiError::DatabaseError(e)
        })?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        job_id
    };

    info!(
        job_id = %job_id,
        employer_id = %authed.id,
        status = %status,
        "Job created successfully"
    );

    let job = fetch_job(&state.db, &job_id).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/employer/jobs - The caller's own postings, any status
pub async fn list_employer_jobs(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Job>>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let jobs = sqlx::query_as::<_, Job>(
        "SELECT * FROM jobs WHERE employer_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(&authed.id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    Ok(Json(jobs))
}

/// PATCH /api/employer/jobs/:id/status
pub async fn update_job_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateJobStatusRequest>,
) -> Result<Json<Job>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let job = fetch_job(&state.db, &id).await?;
    if job.employer_id != authed.id && !authed.is_admin {
        warn!(user_id = %authed.id, job_id = %id, "Job status update denied");
        return Err(ApiError::Forbidden("You can only manage your own jobs".to_string()));
    }

    let current: JobStatus = job.status.parse().map_err(ApiError::InternalServer)?;
    let next: JobStatus = request.status.parse().map_err(ApiError::BadRequest)?;

    if !current.can_move_to(next) {
        return Err(ApiError::BadRequest(format!(
            "Cannot move a job from '{}' to '{}'",
            current, next
        )));
    }

    sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ?")
        .bind(next.as_str())
        .bind(now_timestamp())
        .bind(&id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error updating job status");
            ApiError::DatabaseError(e)
        })?;

    info!(job_id = %id, from = %current, to = %next, "Job status updated");

    Ok(Json(fetch_job(&state.db, &id).await?))
}
