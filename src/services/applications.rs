// src/services/applications.rs

use crate::auth::AuthedUser;
use crate::candidates::models::{
    Application, ApplicationStatusHistory, ApplicationWithDetails, CreateApplicationRequest,
    UpdateApplicationStatusRequest,
};
use crate::candidates::status::{validate_status_transition, ApplicationStatus, StatusActor};
use crate::candidates::validators::{validate_answers, ApplicationValidator};
use crate::common::error::{ensure_row_changed, is_unique_violation_on};
use crate::common::{next_entity_id, now_timestamp, ApiError, AppState, EntityPrefix, Validator};
use crate::jobs::handlers::question_sets::fetch_questions;
use crate::jobs::models::{Job, JobStatus};
use crate::services::interviews::cancel_open_interviews;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Apply a status change and append it to the history
///
/// The update only lands while the row still holds `from`; otherwise the
/// change is refused with a conflict.
pub async fn record_status_change(
    conn: &mut SqliteConnection,
    application_id: &str,
    from: ApplicationStatus,
    to: ApplicationStatus,
    changed_by: &str,
    notes: Option<&str>,
) -> Result<(), ApiError> {
    let now = now_timestamp();

    let updated = sqlx::query(
        "UPDATE applications SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(to.as_str())
    .bind(&now)
    .bind(application_id)
    .bind(from.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!(error = %e, application_id = %application_id, "Database error updating application status");
        ApiError::DatabaseError(e)
    })?;
    ensure_row_changed(updated.rows_affected(), "application")?;

    sqlx::query(
        r#"
        INSERT INTO application_status_history (id, application_id, from_status, status, changed_by, notes, changed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(application_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(changed_by)
    .bind(notes)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!(error = %e, application_id = %application_id, "Database error recording status history");
        ApiError::DatabaseError(e)
    })?;

    debug!(
        application_id = %application_id,
        from = %from,
        to = %to,
        "Application status changed"
    );

    Ok(())
}

async fn fetch_job(pool: &SqlitePool, job_id: &str) -> Result<Job, ApiError> {
    sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
        .bind(job_id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

pub async fn get_application(pool: &SqlitePool, application_id: &str) -> Result<Application, ApiError> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
        .bind(application_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching application");
            ApiError::DatabaseError(e)
        })?
        .ok_or_else(|| {
            warn!(application_id = %application_id, "Application not found");
            ApiError::NotFound("Application not found".to_string())
        })
}

/// Submit an application to an open job
pub async fn create_application(
    state: &AppState,
    candidate: &AuthedUser,
    request: CreateApplicationRequest,
) -> Result<Application, ApiError> {
    info!(
        user_id = %candidate.id,
        job_id = %request.job_id,
        "Creating new job application"
    );

    let validation = ApplicationValidator.validate(&request);
    if !validation.is_valid {
        warn!(
            user_id = %candidate.id,
            job_id = %request.job_id,
            errors = ?validation.errors,
            "Application creation validation failed"
        );
        return Err(validation.into());
    }

    let job = fetch_job(&state.db, &request.job_id).await?;
    if job.status != JobStatus::Open.as_str() {
        return Err(ApiError::BadRequest(
            "This job is not accepting applications".to_string(),
        ));
    }

    let answers: HashMap<String, String> = request
        .answers
        .into_iter()
        .map(|(question, answer)| (question, answer.trim().to_string()))
        .collect();

    let questions = match &job.question_set_id {
        Some(set_id) => fetch_questions(&state.db, set_id).await?,
        None => Vec::new(),
    };
    let answer_check = validate_answers(&questions, &answers);
    if !answer_check.is_valid {
        warn!(
            user_id = %candidate.id,
            job_id = %job.id,
            errors = ?answer_check.errors,
            "Screening answers rejected"
        );
        return Err(answer_check.into());
    }

    let answers_json = serde_json::to_string(&answers)
        .map_err(|e| ApiError::InternalServer(format!("Failed to encode answers: {}", e)))?;

    let application_id = {
        let _lease = state.ids.lease().await;
        let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

        let application_id = next_entity_id(&mut tx, EntityPrefix::Application)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query(
            r#"
            INSERT INTO applications (id, job_id, candidate_id, status, cover_letter, answers)
            VALUES (?, ?, ?, 'submitted', ?, ?)
            "#,
        )
        .bind(&application_id)
        .bind(&job.id)
        .bind(&candidate.id)
        .bind(&request.cover_letter)
        .bind(&answers_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "applications.candidate_id") {
                ApiError::Conflict("You have already applied for this job".to_string())
            } else {
                error!(error = %e, "Database error creating application");
                ApiError::DatabaseError(e)
            }
        })?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        application_id
    };

    info!(
        application_id = %application_id,
        job_id = %job.id,
        user_id = %candidate.id,
        "Application submitted successfully"
    );

    get_application(&state.db, &application_id).await
}

/// Change an application's status on behalf of the candidate or the employer
pub async fn update_application_status(
    state: &AppState,
    actor: &AuthedUser,
    application_id: &str,
    request: UpdateApplicationStatusRequest,
) -> Result<Application, ApiError> {
    let application = get_application(&state.db, application_id).await?;
    let job = fetch_job(&state.db, &application.job_id).await?;

    let actor_kind = if actor.id == application.candidate_id {
        StatusActor::Candidate
    } else if actor.id == job.employer_id || actor.is_admin {
        StatusActor::Employer
    } else {
        warn!(user_id = %actor.id, application_id = %application_id, "Status update denied");
        return Err(ApiError::Forbidden(
            "You cannot change this application".to_string(),
        ));
    };

    let current: ApplicationStatus = application
        .status
        .parse()
        .map_err(ApiError::InternalServer)?;
    let new: ApplicationStatus = request.status.parse().map_err(ApiError::BadRequest)?;

    validate_status_transition(current, new, actor_kind).map_err(|msg| {
        warn!(
            application_id = %application_id,
            from = %current,
            to = %new,
            "Rejected status transition"
        );
        ApiError::BadRequest(msg)
    })?;

    if current == new {
        return Ok(application);
    }

    let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;
    record_status_change(
        &mut tx,
        application_id,
        current,
        new,
        &actor.id,
        request.notes.as_deref(),
    )
    .await?;

    // a closed application no longer holds anyone's calendar
    if matches!(new, ApplicationStatus::Withdrawn | ApplicationStatus::Rejected) {
        let cancelled = cancel_open_interviews(&mut tx, application_id).await?;
        if cancelled > 0 {
            info!(
                application_id = %application_id,
                cancelled = cancelled,
                "Cancelled open interviews of closed application"
            );
        }
    }

    tx.commit().await.map_err(ApiError::DatabaseError)?;

    info!(
        application_id = %application_id,
        from = %current,
        to = %new,
        changed_by = %actor.id,
        "Application status updated"
    );

    get_application(&state.db, application_id).await
}

pub async fn list_candidate_applications(
    pool: &SqlitePool,
    candidate_id: &str,
) -> Result<Vec<Application>, ApiError> {
    sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE candidate_id = ? ORDER BY applied_at DESC, id DESC",
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error fetching candidate applications");
        ApiError::DatabaseError(e)
    })
}

async fn status_history(
    pool: &SqlitePool,
    application_id: &str,
) -> Result<Vec<ApplicationStatusHistory>, ApiError> {
    sqlx::query_as::<_, ApplicationStatusHistory>(
        "SELECT * FROM application_status_history WHERE application_id = ? ORDER BY changed_at ASC, rowid ASC",
    )
    .bind(application_id)
    .fetch_all(pool)
    .await
    .map_err(ApiError::DatabaseError)
}

#[derive(sqlx::FromRow)]
struct ApplicationDetailsRow {
    #[sqlx(flatten)]
    application: Application,
    job_title: Option<String>,
    candidate_name: Option<String>,
    candidate_email: Option<String>,
}

async fn with_details(
    pool: &SqlitePool,
    row: ApplicationDetailsRow,
) -> Result<ApplicationWithDetails, ApiError> {
    let answers = serde_json::from_str(&row.application.answers).unwrap_or_else(|e| {
        warn!(error = %e, application_id = %row.application.id, "Unreadable stored answers");
        HashMap::new()
    });
    let status_history = status_history(pool, &row.application.id).await?;

    Ok(ApplicationWithDetails {
        application: row.application,
        answers,
        job_title: row.job_title,
        candidate_name: row.candidate_name,
        candidate_email: row.candidate_email,
        status_history,
    })
}

const DETAILS_SELECT: &str = r#"
    SELECT a.*, j.title AS job_title, u.name AS candidate_name, u.email AS candidate_email
    FROM applications a
    LEFT JOIN jobs j ON j.id = a.job_id
    LEFT JOIN users u ON u.id = a.candidate_id
"#;

/// Applications to one job, visible to its employer
pub async fn list_job_applications(
    state: &AppState,
    actor: &AuthedUser,
    job_id: &str,
) -> Result<Vec<ApplicationWithDetails>, ApiError> {
    let job = fetch_job(&state.db, job_id).await?;
    if job.employer_id != actor.id && !actor.is_admin {
        return Err(ApiError::Forbidden(
            "You can only view applications for your own jobs".to_string(),
        ));
    }

    let query = format!("{} WHERE a.job_id = ? ORDER BY a.applied_at ASC, a.id ASC", DETAILS_SELECT);
    let rows = sqlx::query_as::<_, ApplicationDetailsRow>(&query)
        .bind(job_id)
        .fetch_all(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching job applications");
            ApiError::DatabaseError(e)
        })?;

    let mut applications = Vec::with_capacity(rows.len());
    for row in rows {
        applications.push(with_details(&state.db, row).await?);
    }

    debug!(job_id = %job_id, count = applications.len(), "Fetched job applications");
    Ok(applications)
}

/// Single application, for its candidate or the job's employer
pub async fn get_application_details(
    state: &AppState,
    actor: &AuthedUser,
    application_id: &str,
) -> Result<ApplicationWithDetails, ApiError> {
    let query = format!("{} WHERE a.id = ?", DETAILS_SELECT);
    let row = sqlx::query_as::<_, ApplicationDetailsRow>(&query)
        .bind(application_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    if row.application.candidate_id != actor.id && !actor.is_admin {
        let job = fetch_job(&state.db, &row.application.job_id).await?;
        if job.employer_id != actor.id {
            return Err(ApiError::Forbidden(
                "You cannot view this application".to_string(),
            ));
        }
    }

    with_details(&state.db, row).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::common::migrations::test_support::*;
    use crate::common::state::test_support::test_state;

    const EMPLOYER: &str = "USR0000001";
    const CANDIDATE: &str = "USR0000002";

    fn user(id: &str, role: Role) -> AuthedUser {
        AuthedUser {
            id: id.to_string(),
            email: format!("{}@example.com", id.to_lowercase()),
            role,
            is_admin: false,
        }
    }

    async fn seeded_state() -> AppState {
        let pool = test_pool().await;
        insert_user(&pool, EMPLOYER, "boss@example.com", "employer").await;
        insert_user(&pool, CANDIDATE, "cand@example.com", "candidate").await;
        insert_user(&pool, "USR0000003", "cand2@example.com", "candidate").await;
        insert_job(&pool, "JOB0000001", EMPLOYER, "open").await;
        insert_job(&pool, "JOB0000002", EMPLOYER, "draft").await;
        test_state(pool)
    }

    fn apply(job_id: &str) -> CreateApplicationRequest {
        CreateApplicationRequest {
            job_id: job_id.to_string(),
            cover_letter: Some("I would love to join".to_string()),
            answers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_apply_once_per_job() {
        let state = seeded_state().await;
        let candidate = user(CANDIDATE, Role::Candidate);

        let created = create_application(&state, &candidate, apply("JOB0000001"))
            .await
            .unwrap();
        assert_eq!(created.id, "APP0000001");
        assert_eq!(created.status, "submitted");

        let err = create_application(&state, &candidate, apply("JOB0000001"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let other = create_application(&state, &user("USR0000003", Role::Candidate), apply("JOB0000001"))
            .await
            .unwrap();
        assert_eq!(other.id, "APP0000002");
    }

    #[tokio::test]
    async fn test_cannot_apply_to_draft_or_missing_job() {
        let state = seeded_state().await;
        let candidate = user(CANDIDATE, Role::Candidate);

        let err = create_application(&state, &candidate, apply("JOB0000002"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = create_application(&state, &candidate, apply("JOB0009999"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_changes_are_recorded() {
        let state = seeded_state().await;
        let candidate = user(CANDIDATE, Role::Candidate);
        let employer = user(EMPLOYER, Role::Employer);

        let app = create_application(&state, &candidate, apply("JOB0000001"))
            .await
            .unwrap();

        let moved = update_application_status(
            &state,
            &employer,
            &app.id,
            UpdateApplicationStatusRequest {
                status: "shortlisted".to_string(),
                notes: Some("strong profile".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.status, "shortlisted");

        // employers never move backward
        let err = update_application_status(
            &state,
            &employer,
            &app.id,
            UpdateApplicationStatusRequest {
                status: "reviewed".to_string(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        // candidates may only withdraw
        let err = update_application_status(
            &state,
            &candidate,
            &app.id,
            UpdateApplicationStatusRequest {
                status: "offered".to_string(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        update_application_status(
            &state,
            &candidate,
            &app.id,
            UpdateApplicationStatusRequest {
                status: "withdrawn".to_string(),
                notes: None,
            },
        )
        .await
        .unwrap();

        let details = get_application_details(&state, &employer, &app.id).await.unwrap();
        let steps: Vec<(Option<&str>, &str)> = details
            .status_history
            .iter()
            .map(|h| (h.from_status.as_deref(), h.status.as_str()))
            .collect();
        assert_eq!(
            steps,
            vec![
                (Some("submitted"), "shortlisted"),
                (Some("shortlisted"), "withdrawn"),
            ]
        );
        assert_eq!(details.candidate_email.as_deref(), Some("cand@example.com"));

        let err = get_application_details(&state, &user("USR0000003", Role::Candidate), &app.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_listing_is_scoped() {
        let state = seeded_state().await;
        let candidate = user(CANDIDATE, Role::Candidate);

        create_application(&state, &candidate, apply("JOB0000001"))
            .await
            .unwrap();

        let mine = list_candidate_applications(&state.db, CANDIDATE).await.unwrap();
        assert_eq!(mine.len(), 1);

        let for_job = list_job_applications(&state, &user(EMPLOYER, Role::Employer), "JOB0000001")
            .await
            .unwrap();
        assert_eq!(for_job.len(), 1);
        assert_eq!(for_job[0].job_title.as_deref(), Some("Job JOB0000001"));

        let err = list_job_applications(&state, &candidate, "JOB0000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_stale_status_change_is_refused() {
        let state = seeded_state().await;
        insert_application(&state.db, "APP0000001", "JOB0000001", CANDIDATE, "reviewed").await;

        // written as if the row were still "submitted"
        let mut conn = state.db.acquire().await.unwrap();
        let err = record_status_change(
            &mut conn,
            "APP0000001",
            ApplicationStatus::Submitted,
            ApplicationStatus::Shortlisted,
            EMPLOYER,
            None,
        )
        .await
        .unwrap_err();
        drop(conn);
        assert!(matches!(err, ApiError::Conflict(_)));

        let app = get_application(&state.db, "APP0000001").await.unwrap();
        assert_eq!(app.status, "reviewed");
        let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM application_status_history")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(history, 0);
    }

    #[tokio::test]
    async fn test_withdrawal_cancels_open_interviews() {
        let state = seeded_state().await;
        insert_application(&state.db, "APP0000001", "JOB0000001", CANDIDATE, "interview_scheduled").await;

        for (id, status) in [("INT0000001", "scheduled"), ("INT0000002", "completed")] {
            sqlx::query(
                r#"INSERT INTO interviews (id, application_id, employer_id, candidate_id, job_id,
                    start_at, end_at, mode, status, created_by)
                   VALUES (?, 'APP0000001', ?, ?, 'JOB0000001',
                    '2099-01-01T10:00:00Z', '2099-01-01T11:00:00Z', 'online', ?, ?)"#,
            )
            .bind(id)
            .bind(EMPLOYER)
            .bind(CANDIDATE)
            .bind(status)
            .bind(EMPLOYER)
            .execute(&state.db)
            .await
            .unwrap();
        }

        update_application_status(
            &state,
            &user(CANDIDATE, Role::Candidate),
            "APP0000001",
            UpdateApplicationStatusRequest {
                status: "withdrawn".to_string(),
                notes: None,
            },
        )
        .await
        .unwrap();

        let statuses: Vec<(String, String)> =
            sqlx::query_as("SELECT id, status FROM interviews ORDER BY id")
                .fetch_all(&state.db)
                .await
                .unwrap();
        assert_eq!(
            statuses,
            vec![
                ("INT0000001".to_string(), "cancelled".to_string()),
                ("INT0000002".to_string(), "completed".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applications_get_distinct_contiguous_ids() {
        const APPLICANTS: usize = 8;

        let path = std::env::temp_dir().join(format!("hirehub-ids-{}.db", Uuid::new_v4()));
        let pool = file_pool(&path, 4).await;
        insert_user(&pool, EMPLOYER, "boss@example.com", "employer").await;
        insert_job(&pool, "JOB0000001", EMPLOYER, "open").await;
        for n in 1..=APPLICANTS {
            let id = format!("USR{:07}", 100 + n);
            insert_user(&pool, &id, &format!("c{}@example.com", n), "candidate").await;
        }
        let state = test_state(pool.clone());

        let mut tasks = tokio::task::JoinSet::new();
        for n in 1..=APPLICANTS {
            let state = state.clone();
            let candidate = user(&format!("USR{:07}", 100 + n), Role::Candidate);
            tasks.spawn(async move {
                create_application(&state, &candidate, apply("JOB0000001")).await
            });
        }

        let mut ids = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            ids.push(joined.unwrap().unwrap().id);
        }
        ids.sort();

        let expected: Vec<String> = (1..=APPLICANTS).map(|n| format!("APP{:07}", n)).collect();
        assert_eq!(ids, expected);

        drop(state);
        remove_file_pool(pool, &path).await;
    }
}
