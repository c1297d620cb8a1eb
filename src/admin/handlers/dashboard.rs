// src/admin/handlers/dashboard.rs

use axum::{extract::Extension, Json};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::admin::models::DashboardMetrics;
use crate::auth::AuthedUser;
use crate::candidates::status::ACTIVE_INTERVIEW_STATUSES_SQL;
use crate::common::{now_timestamp, ApiError, AppState};

/// Row counts grouped by one column of one table
async fn count_by(
    pool: &SqlitePool,
    table: &str,
    column: &str,
) -> Result<BTreeMap<String, i64>, ApiError> {
    let query = format!(
        "SELECT {column}, COUNT(*) FROM {table} GROUP BY {column}",
        column = column,
        table = table
    );

    let rows: Vec<(String, i64)> = sqlx::query_as(&query)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                table = %table,
                "Database error fetching counts for dashboard metrics"
            );
            ApiError::DatabaseError(e)
        })?;

    Ok(rows.into_iter().collect())
}

async fn dashboard_metrics(pool: &SqlitePool) -> Result<DashboardMetrics, ApiError> {
    let users_by_role = count_by(pool, "users", "role").await?;
    let jobs_by_status = count_by(pool, "jobs", "status").await?;
    let applications_by_status = count_by(pool, "applications", "status").await?;

    let now = now_timestamp();
    let upcoming_interviews = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM interviews WHERE status IN ({}) AND start_at > ?",
        ACTIVE_INTERVIEW_STATUSES_SQL
    ))
    .bind(&now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(
            error = %e,
            "Database error fetching upcoming interview count for dashboard metrics"
        );
        ApiError::DatabaseError(e)
    })?;

    Ok(DashboardMetrics {
        total_users: users_by_role.values().sum(),
        total_jobs: jobs_by_status.values().sum(),
        total_applications: applications_by_status.values().sum(),
        upcoming_interviews,
        last_updated: now,
        users_by_role,
        jobs_by_status,
        applications_by_status,
    })
}

/// GET /api/admin/dashboard - Platform-wide counts
pub async fn get_dashboard_metrics(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<DashboardMetrics>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();

    info!(admin_user_id = %authed.id, "Fetching dashboard metrics");

    Ok(Json(dashboard_metrics(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::common::migrations::test_support::*;
    use crate::common::state::test_support::test_state;
    use crate::common::format_timestamp;
    use chrono::{Duration, Utc};

    fn user(is_admin: bool) -> AuthedUser {
        AuthedUser {
            id: "USR0000001".to_string(),
            email: "boss@example.com".to_string(),
            role: Role::Employer,
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let pool = test_pool().await;
        insert_user(&pool, "USR0000001", "boss@example.com", "employer").await;
        insert_user(&pool, "USR0000002", "a@example.com", "candidate").await;
        insert_user(&pool, "USR0000003", "b@example.com", "candidate").await;
        insert_job(&pool, "JOB0000001", "USR0000001", "open").await;
        insert_job(&pool, "JOB0000002", "USR0000001", "draft").await;
        insert_application(&pool, "APP0000001", "JOB0000001", "USR0000002", "submitted").await;
        insert_application(&pool, "APP0000002", "JOB0000001", "USR0000003", "interview_scheduled").await;

        let start = Utc::now() + Duration::days(1);
        for (id, status) in [("INT0000001", "scheduled"), ("INT0000002", "cancelled")] {
            sqlx::query(
                r#"INSERT INTO interviews (id, application_id, employer_id, candidate_id, job_id,
                    start_at, end_at, mode, status, created_by)
                   VALUES (?, 'APP0000002', 'USR0000001', 'USR0000003', 'JOB0000001', ?, ?, 'phone', ?, 'USR0000001')"#,
            )
            .bind(id)
            .bind(format_timestamp(&start))
            .bind(format_timestamp(&(start + Duration::hours(1))))
            .bind(status)
            .execute(&pool)
            .await
            .unwrap();
        }

        let metrics = dashboard_metrics(&pool).await.unwrap();
        assert_eq!(metrics.total_users, 3);
        assert_eq!(metrics.users_by_role.get("candidate"), Some(&2));
        assert_eq!(metrics.total_jobs, 2);
        assert_eq!(metrics.jobs_by_status.get("open"), Some(&1));
        assert_eq!(metrics.applications_by_status.get("interview_scheduled"), Some(&1));
        assert_eq!(metrics.upcoming_interviews, 1);
    }

    #[tokio::test]
    async fn test_dashboard_requires_admin() {
        let shared = Arc::new(RwLock::new(test_state(test_pool().await)));

        let err = get_dashboard_metrics(Extension(shared.clone()), user(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let Json(metrics) = get_dashboard_metrics(Extension(shared), user(true)).await.unwrap();
        assert_eq!(metrics.total_users, 0);
    }
}
