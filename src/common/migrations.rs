// src/common/migrations.rs
//! Database schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. With `RESET_DB=true` every table is dropped
/// first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    create_schema(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_tables(pool).await?;
    create_job_tables(pool).await?;
    create_application_tables(pool).await?;
    create_interview_tables(pool).await?;
    create_indexes(pool).await?;
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Children before parents so foreign keys never dangle mid-drop
    let tables = [
        "interviews",
        "application_status_history",
        "applications",
        "jobs",
        "questions",
        "question_sets",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('candidate', 'employer', 'admin')),
            email_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_job_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Question sets: reusable groups of custom application questions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_sets (
            id TEXT PRIMARY KEY,
            employer_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            FOREIGN KEY(employer_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            question_set_id TEXT NOT NULL,
            prompt TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('text', 'yes_no', 'choice')),
            options TEXT,
            required INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL,
            FOREIGN KEY(question_set_id) REFERENCES question_sets(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            employer_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            location TEXT,
            job_type TEXT,
            salary_min INTEGER,
            salary_max INTEGER,
            question_set_id TEXT,
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'open', 'closed')),
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            FOREIGN KEY(employer_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(question_set_id) REFERENCES question_sets(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_application_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            candidate_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'submitted' CHECK (status IN (
                'submitted', 'reviewed', 'shortlisted', 'interview_scheduled', 'interviewed',
                'offered', 'hired', 'rejected', 'withdrawn'
            )),
            cover_letter TEXT,
            answers TEXT NOT NULL DEFAULT '{}',
            applied_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            UNIQUE(job_id, candidate_id),
            FOREIGN KEY(job_id) REFERENCES jobs(id) ON DELETE CASCADE,
            FOREIGN KEY(candidate_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS application_status_history (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL,
            from_status TEXT,
            status TEXT NOT NULL,
            changed_by TEXT NOT NULL,
            notes TEXT,
            changed_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            FOREIGN KEY(application_id) REFERENCES applications(id) ON DELETE CASCADE,
            FOREIGN KEY(changed_by) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_interview_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // start_at/end_at form the half-open slot [start_at, end_at)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interviews (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL,
            employer_id TEXT NOT NULL,
            candidate_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT NOT NULL,
            mode TEXT NOT NULL CHECK (mode IN ('online', 'onsite', 'phone')),
            location TEXT,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'scheduled' CHECK (status IN (
                'scheduled', 'rescheduled', 'completed', 'cancelled', 'no_show'
            )),
            created_by TEXT NOT NULL,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            CHECK (end_at > start_at),
            FOREIGN KEY(application_id) REFERENCES applications(id) ON DELETE CASCADE,
            FOREIGN KEY(employer_id) REFERENCES users(id),
            FOREIGN KEY(candidate_id) REFERENCES users(id),
            FOREIGN KEY(job_id) REFERENCES jobs(id),
            FOREIGN KEY(created_by) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_jobs_employer ON jobs(employer_id)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)",
        "CREATE INDEX IF NOT EXISTS idx_question_sets_employer ON question_sets(employer_id)",
        "CREATE INDEX IF NOT EXISTS idx_questions_set ON questions(question_set_id, position)",
        "CREATE INDEX IF NOT EXISTS idx_applications_candidate ON applications(candidate_id)",
        "CREATE INDEX IF NOT EXISTS idx_applications_job ON applications(job_id)",
        "CREATE INDEX IF NOT EXISTS idx_status_history_application ON application_status_history(application_id)",
        "CREATE INDEX IF NOT EXISTS idx_interviews_employer_start ON interviews(employer_id, start_at)",
        "CREATE INDEX IF NOT EXISTS idx_interviews_candidate_start ON interviews(candidate_id, start_at)",
        "CREATE INDEX IF NOT EXISTS idx_interviews_application ON interviews(application_id)",
    ];

    for index in indexes {
        sqlx::query(index).execute(pool).await?;
    }

    info!("📊 Created performance indexes");

    Ok(())
}
