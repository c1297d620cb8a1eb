// src/services/interviews.rs

use crate::auth::AuthedUser;
use crate::candidates::models::{
    AvailabilityCheckResponse, CreateInterviewRequest, Interview, InterviewWithDetails,
    RescheduleInterviewRequest,
};
use crate::candidates::status::{ApplicationStatus, InterviewStatus, ACTIVE_INTERVIEW_STATUSES_SQL};
use crate::common::error::ensure_row_changed;
use crate::common::{
    format_timestamp, next_entity_id, now_timestamp, parse_timestamp, ApiError, AppState,
    EntityPrefix, Validator,
};
use crate::services::applications::record_status_change;
use crate::services::email;
use crate::services::scheduling::{
    find_conflict, validate_slot, Reservation, SchedulingError, TimeRange,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

impl From<SchedulingError> for ApiError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::Conflict(_) => ApiError::Conflict(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

/// Parse a pair of RFC 3339 timestamps into a validated half-open range
pub fn parse_range(start_at: &str, end_at: &str) -> Result<TimeRange, ApiError> {
    let start = parse_timestamp(start_at).map_err(|e| {
        warn!(error = %e, start_at = %start_at, "Invalid start_at format");
        ApiError::BadRequest(format!("Invalid start_at format: {}", e))
    })?;
    let end = parse_timestamp(end_at).map_err(|e| {
        warn!(error = %e, end_at = %end_at, "Invalid end_at format");
        ApiError::BadRequest(format!("Invalid end_at format: {}", e))
    })?;
    Ok(TimeRange::new(start, end)?)
}

#[derive(Debug, Clone, Copy)]
enum SlotOwner {
    Employer,
    Candidate,
}

impl SlotOwner {
    fn column(&self) -> &'static str {
        match self {
            SlotOwner::Employer => "employer_id",
            SlotOwner::Candidate => "candidate_id",
        }
    }
}

/// Interviews of one employer (or candidate) whose stored slot touches `range`
///
/// Status is not filtered here: terminal rows come back flagged and the
/// overlap check skips them.
async fn load_reservations(
    conn: &mut SqliteConnection,
    owner: SlotOwner,
    owner_id: &str,
    range: &TimeRange,
) -> Result<Vec<Reservation>, ApiError> {
    let query = format!(
        "SELECT id, start_at, end_at, status FROM interviews WHERE {} = ? AND start_at < ? AND end_at > ?",
        owner.column()
    );

    let rows: Vec<(String, String, String, String)> = sqlx::query_as(&query)
        .bind(owner_id)
        .bind(format_timestamp(&range.end()))
        .bind(format_timestamp(&range.start()))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error loading interview reservations");
            ApiError::DatabaseError(e)
        })?;

    let mut reservations = Vec::with_capacity(rows.len());
    for (id, start_at, end_at, status) in rows {
        let parsed = parse_timestamp(&start_at)
            .ok()
            .zip(parse_timestamp(&end_at).ok())
            .and_then(|(start, end)| TimeRange::new(start, end).ok());

        let Some(slot) = parsed else {
            warn!(interview_id = %id, "Skipping interview with unreadable time slot");
            continue;
        };

        let terminal = status
            .parse::<InterviewStatus>()
            .map(|s| s.is_terminal())
            .unwrap_or(false);

        reservations.push(Reservation {
            id,
            range: slot,
            terminal,
        });
    }

    Ok(reservations)
}

/// Fails with a conflict when the employer or the candidate is already booked
async fn ensure_slot_free(
    conn: &mut SqliteConnection,
    employer_id: &str,
    candidate_id: &str,
    range: &TimeRange,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let employer_slots = load_reservations(conn, SlotOwner::Employer, employer_id, range).await?;
    if let Some(hit) = find_conflict(range, &employer_slots, exclude_id) {
        info!(
            employer_id = %employer_id,
            conflicting_id = %hit.id,
            "Interview slot conflicts with employer schedule"
        );
        return Err(SchedulingError::Conflict(hit.id.clone()).into());
    }

    let candidate_slots =
        load_reservations(conn, SlotOwner::Candidate, candidate_id, range).await?;
    if let Some(hit) = find_conflict(range, &candidate_slots, exclude_id) {
        info!(
            candidate_id = %candidate_id,
            conflicting_id = %hit.id,
            "Interview slot conflicts with candidate schedule"
        );
        return Err(ApiError::Conflict(format!(
            "Candidate already has interview {} at that time",
            hit.id
        )));
    }

    Ok(())
}

fn ensure_owner(actor: &AuthedUser, employer_id: &str) -> Result<(), ApiError> {
    if actor.is_admin || actor.id == employer_id {
        Ok(())
    } else {
        warn!(user_id = %actor.id, employer_id = %employer_id, "Interview access denied");
        Err(ApiError::Forbidden(
            "You can only manage interviews for your own jobs".to_string(),
        ))
    }
}

/// Row used while scheduling: the application plus its job's owner
#[derive(Debug, sqlx::FromRow)]
struct ApplicationForScheduling {
    id: String,
    candidate_id: String,
    job_id: String,
    status: String,
    employer_id: String,
    job_title: String,
    candidate_name: String,
    candidate_email: String,
}

async fn fetch_application_for_scheduling(
    pool: &SqlitePool,
    application_id: &str,
) -> Result<ApplicationForScheduling, ApiError> {
    sqlx::query_as::<_, ApplicationForScheduling>(
        r#"
        SELECT a.id, a.candidate_id, a.job_id, a.status, j.employer_id,
               j.title AS job_title, u.name AS candidate_name, u.email AS candidate_email
        FROM applications a
        JOIN jobs j ON j.id = a.job_id
        JOIN users u ON u.id = a.candidate_id
        WHERE a.id = ?
        "#,
    )
    .bind(application_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error fetching application for scheduling");
        ApiError::DatabaseError(e)
    })?
    .ok_or_else(|| {
        warn!(application_id = %application_id, "Application not found for interview scheduling");
        ApiError::NotFound("Application not found".to_string())
    })
}

/// Check whether a slot is free for the acting employer
pub async fn check_availability(
    pool: &SqlitePool,
    employer_id: &str,
    range: &TimeRange,
    exclude_id: Option<&str>,
) -> Result<AvailabilityCheckResponse, ApiError> {
    let mut conn = pool.acquire().await.map_err(ApiError::DatabaseError)?;
    let slots = load_reservations(&mut conn, SlotOwner::Employer, employer_id, range).await?;
    let hit = find_conflict(range, &slots, exclude_id);

    Ok(AvailabilityCheckResponse {
        conflict: hit.is_some(),
        conflicting_id: hit.map(|r| r.id.clone()),
    })
}

/// Schedule an interview with validation and conflict detection
pub async fn schedule_interview(
    state: &AppState,
    actor: &AuthedUser,
    request: CreateInterviewRequest,
) -> Result<Interview, ApiError> {
    debug!(
        application_id = %request.application_id,
        start_at = %request.start_at,
        end_at = %request.end_at,
        "Scheduling interview"
    );

    let validation = crate::candidates::validators::InterviewValidator.validate(&request);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let range = parse_range(&request.start_at, &request.end_at)?;
    validate_slot(&range, Utc::now())?;

    let application = fetch_application_for_scheduling(&state.db, &request.application_id).await?;
    ensure_owner(actor, &application.employer_id)?;

    let app_status: ApplicationStatus = application
        .status
        .parse()
        .map_err(ApiError::InternalServer)?;
    if app_status.is_final() {
        return Err(ApiError::Conflict(format!(
            "Cannot schedule an interview for a {} application",
            app_status
        )));
    }

    // Slot checks and the insert must not interleave with another booking
    let _lease = state.ids.lease().await;
    let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

    ensure_slot_free(
        &mut tx,
        &application.employer_id,
        &application.candidate_id,
        &range,
        None,
    )
    .await?;

    let interview_id = next_entity_id(&mut tx, EntityPrefix::Interview)
        .await
        .map_err(ApiError::DatabaseError)?;
    insert_interview(&mut tx, &interview_id, &application, &range, &request, &actor.id).await?;

    if app_status.order() < ApplicationStatus::InterviewScheduled.order() {
        record_status_change(
            &mut tx,
            &application.id,
            app_status,
            ApplicationStatus::InterviewScheduled,
            &actor.id,
            Some(&format!("Interview {} scheduled", interview_id)),
        )
        .await?;
    }

    tx.commit().await.map_err(ApiError::DatabaseError)?;
    drop(_lease);

    let interview = get_interview(&state.db, &interview_id).await?;

    info!(
        interview_id = %interview_id,
        application_id = %application.id,
        start_at = %interview.start_at,
        end_at = %interview.end_at,
        "Interview scheduled successfully"
    );

    let template = email::interview_scheduled_template(
        &application.candidate_name,
        &application.job_title,
        &interview.start_at,
        &interview.end_at,
        &interview.mode,
        interview.location.as_deref(),
    );
    if let Err(e) = state
        .mailer
        .send(&application.candidate_email, &template.subject, &template.body)
        .await
    {
        warn!(error = %e, interview_id = %interview_id, "Failed to send interview invitation");
    }

    Ok(interview)
}

/// Move an interview to a new slot, keeping its identity
pub async fn reschedule_interview(
    state: &AppState,
    actor: &AuthedUser,
    interview_id: &str,
    request: RescheduleInterviewRequest,
) -> Result<Interview, ApiError> {
    debug!(interview_id = %interview_id, "Rescheduling interview");

    let existing = get_interview(&state.db, interview_id).await?;
    ensure_owner(actor, &existing.employer_id)?;

    let status: InterviewStatus = existing.status.parse().map_err(ApiError::InternalServer)?;
    if status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Cannot reschedule a {} interview",
            status
        )));
    }

    let range = parse_range(&request.start_at, &request.end_at)?;
    validate_slot(&range, Utc::now())?;

    let _lease = state.ids.lease().await;
    let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

    ensure_slot_free(
        &mut tx,
        &existing.employer_id,
        &existing.candidate_id,
        &range,
        Some(interview_id),
    )
    .await?;

    move_interview(&mut tx, &existing, &range, &request).await?;

    tx.commit().await.map_err(ApiError::DatabaseError)?;
    drop(_lease);

    let updated = get_interview(&state.db, interview_id).await?;

    info!(
        interview_id = %interview_id,
        start_at = %updated.start_at,
        end_at = %updated.end_at,
        "Interview rescheduled successfully"
    );

    if let Some((name, email_addr, title)) = candidate_contact(&state.db, &updated).await {
        let template =
            email::interview_rescheduled_template(&name, &title, &updated.start_at, &updated.end_at);
        if let Err(e) = state.mailer.send(&email_addr, &template.subject, &template.body).await {
            warn!(error = %e, interview_id = %interview_id, "Failed to send reschedule notice");
        }
    }

    Ok(updated)
}

/// Cancel, complete or mark no-show
///
/// Only scheduled/rescheduled interviews change status. Completing or marking
/// a no-show requires the interview to have started.
pub async fn close_interview(
    state: &AppState,
    actor: &AuthedUser,
    interview_id: &str,
    new_status: InterviewStatus,
) -> Result<Interview, ApiError> {
    if !new_status.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "{} is not a closing status",
            new_status
        )));
    }

    let existing = get_interview(&state.db, interview_id).await?;
    ensure_owner(actor, &existing.employer_id)?;

    let current: InterviewStatus = existing.status.parse().map_err(ApiError::InternalServer)?;
    if current.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Interview is already {}",
            current
        )));
    }

    if matches!(new_status, InterviewStatus::Completed | InterviewStatus::NoShow) {
        let start = parse_timestamp(&existing.start_at)
            .map_err(|e| ApiError::InternalServer(format!("Corrupt start_at: {}", e)))?;
        if start > Utc::now() {
            return Err(ApiError::BadRequest(format!(
                "Cannot mark an interview {} before it starts",
                new_status
            )));
        }
    }

    let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

    claim_interview_status(&mut tx, &existing, new_status).await?;

    if new_status == InterviewStatus::Completed {
        let app_status: String = sqlx::query_scalar("SELECT status FROM applications WHERE id = ?")
            .bind(&existing.application_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;
        let app_status: ApplicationStatus = app_status.parse().map_err(ApiError::InternalServer)?;

        if !app_status.is_final()
            && app_status.order() < ApplicationStatus::Interviewed.order()
        {
            record_status_change(
                &mut tx,
                &existing.application_id,
                app_status,
                ApplicationStatus::Interviewed,
                &actor.id,
                Some(&format!("Interview {} completed", interview_id)),
            )
            .await?;
        }
    }

    tx.commit().await.map_err(ApiError::DatabaseError)?;

    let updated = get_interview(&state.db, interview_id).await?;

    info!(
        interview_id = %interview_id,
        from = %current,
        to = %new_status,
        "Interview status updated"
    );

    if new_status == InterviewStatus::Cancelled {
        if let Some((name, email_addr, title)) = candidate_contact(&state.db, &updated).await {
            let template = email::interview_cancelled_template(&name, &title, &updated.start_at);
            if let Err(e) = state.mailer.send(&email_addr, &template.subject, &template.body).await
            {
                warn!(
                    error = %e,
                    interview_id = %interview_id,
                    "Failed to send cancellation notification, but interview was cancelled"
                );
            }
        }
    }

    Ok(updated)
}

/// Insert a new interview, provided the application still holds the status
/// it was validated with
async fn insert_interview(
    conn: &mut SqliteConnection,
    interview_id: &str,
    application: &ApplicationForScheduling,
    range: &TimeRange,
    request: &CreateInterviewRequest,
    created_by: &str,
) -> Result<(), ApiError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO interviews (
            id, application_id, employer_id, candidate_id, job_id, start_at, end_at,
            mode, location, notes, status, created_by
        )
        SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'scheduled', ?
        WHERE EXISTS (SELECT 1 FROM applications WHERE id = ? AND status = ?)
        "#,
    )
    .bind(interview_id)
    .bind(&application.id)
    .bind(&application.employer_id)
    .bind(&application.candidate_id)
    .bind(&application.job_id)
    .bind(format_timestamp(&range.start()))
    .bind(format_timestamp(&range.end()))
    .bind(request.mode.trim())
    .bind(&request.location)
    .bind(&request.notes)
    .bind(created_by)
    .bind(&application.id)
    .bind(&application.status)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error creating interview");
        ApiError::DatabaseError(e)
    })?;

    ensure_row_changed(inserted.rows_affected(), "application")
}

/// Write a new slot over `existing`, provided its status is unchanged
async fn move_interview(
    conn: &mut SqliteConnection,
    existing: &Interview,
    range: &TimeRange,
    request: &RescheduleInterviewRequest,
) -> Result<(), ApiError> {
    let updated = sqlx::query(
        r#"
        UPDATE interviews
        SET start_at = ?, end_at = ?, location = COALESCE(?, location), notes = COALESCE(?, notes),
            status = 'rescheduled', updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(format_timestamp(&range.start()))
    .bind(format_timestamp(&range.end()))
    .bind(&request.location)
    .bind(&request.notes)
    .bind(now_timestamp())
    .bind(&existing.id)
    .bind(&existing.status)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error rescheduling interview");
        ApiError::DatabaseError(e)
    })?;

    ensure_row_changed(updated.rows_affected(), "interview")
}

async fn claim_interview_status(
    conn: &mut SqliteConnection,
    existing: &Interview,
    new_status: InterviewStatus,
) -> Result<(), ApiError> {
    let updated = sqlx::query(
        "UPDATE interviews SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(new_status.as_str())
    .bind(now_timestamp())
    .bind(&existing.id)
    .bind(&existing.status)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error updating interview status");
        ApiError::DatabaseError(e)
    })?;

    ensure_row_changed(updated.rows_affected(), "interview")
}

/// Cancel every scheduled or rescheduled interview of one application
pub async fn cancel_open_interviews(
    conn: &mut SqliteConnection,
    application_id: &str,
) -> Result<u64, ApiError> {
    let query = format!(
        "UPDATE interviews SET status = 'cancelled', updated_at = ? WHERE application_id = ? AND status IN ({})",
        ACTIVE_INTERVIEW_STATUSES_SQL
    );

    let cancelled = sqlx::query(&query)
        .bind(now_timestamp())
        .bind(application_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!(error = %e, application_id = %application_id, "Database error cancelling interviews");
            ApiError::DatabaseError(e)
        })?;

    Ok(cancelled.rows_affected())
}

async fn candidate_contact(pool: &SqlitePool, interview: &Interview) -> Option<(String, String, String)> {
    let row: Result<Option<(String, String, String)>, _> = sqlx::query_as(
        r#"
        SELECT u.name, u.email, j.title
        FROM users u, jobs j
        WHERE u.id = ? AND j.id = ?
        "#,
    )
    .bind(&interview.candidate_id)
    .bind(&interview.job_id)
    .fetch_optional(pool)
    .await;

    match row {
        Ok(contact) => contact,
        Err(e) => {
            warn!(error = %e, interview_id = %interview.id, "Could not load candidate contact");
            None
        }
    }
}

/// Get interview by ID
pub async fn get_interview(pool: &SqlitePool, interview_id: &str) -> Result<Interview, ApiError> {
    sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = ?")
        .bind(interview_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching interview");
            ApiError::DatabaseError(e)
        })?
        .ok_or_else(|| {
            warn!(interview_id = %interview_id, "Interview not found");
            ApiError::NotFound("Interview not found".to_string())
        })
}

const DETAILS_SELECT: &str = r#"
    SELECT i.*, u.name AS candidate_name, j.title AS job_title
    FROM interviews i
    JOIN users u ON u.id = i.candidate_id
    JOIN jobs j ON j.id = i.job_id
"#;

#[derive(sqlx::FromRow)]
struct InterviewDetailsRow {
    #[sqlx(flatten)]
    interview: Interview,
    candidate_name: String,
    job_title: String,
}

impl From<InterviewDetailsRow> for InterviewWithDetails {
    fn from(row: InterviewDetailsRow) -> Self {
        InterviewWithDetails {
            interview: row.interview,
            candidate_name: row.candidate_name,
            job_title: row.job_title,
        }
    }
}

/// Employer calendar, optionally limited to slots touching `[from, to)`
pub async fn list_employer_interviews(
    pool: &SqlitePool,
    employer_id: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<InterviewWithDetails>, ApiError> {
    let from = from
        .map(parse_timestamp)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("Invalid from: {}", e)))?;
    let to = to
        .map(parse_timestamp)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("Invalid to: {}", e)))?;

    let mut query = format!("{} WHERE i.employer_id = ?", DETAILS_SELECT);
    if from.is_some() {
        query.push_str(" AND i.end_at > ?");
    }
    if to.is_some() {
        query.push_str(" AND i.start_at < ?");
    }
    query.push_str(" ORDER BY i.start_at ASC");

    let mut query_builder = sqlx::query_as::<_, InterviewDetailsRow>(&query).bind(employer_id);
    if let Some(from) = from {
        query_builder = query_builder.bind(format_timestamp(&from));
    }
    if let Some(to) = to {
        query_builder = query_builder.bind(format_timestamp(&to));
    }

    let rows = query_builder.fetch_all(pool).await.map_err(|e| {
        error!(error = %e, "Database error fetching employer interviews");
        ApiError::DatabaseError(e)
    })?;

    debug!(employer_id = %employer_id, count = rows.len(), "Fetched employer interviews");

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Interviews for a specific candidate
pub async fn list_candidate_interviews(
    pool: &SqlitePool,
    candidate_id: &str,
) -> Result<Vec<InterviewWithDetails>, ApiError> {
    let query = format!("{} WHERE i.candidate_id = ? ORDER BY i.start_at ASC", DETAILS_SELECT);
    let rows = sqlx::query_as::<_, InterviewDetailsRow>(&query)
        .bind(candidate_id)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching candidate interviews");
            ApiError::DatabaseError(e)
        })?;

    Ok(rows.into_iter().map(Into::into).collect())
}
