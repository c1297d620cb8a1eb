// src/jobs/handlers/question_sets.rs

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::AuthedUser;
use crate::common::{next_entity_id, ApiError, AppState, EntityPrefix, Validator};
use crate::jobs::models::*;
use crate::jobs::validators::QuestionSetValidator;

/// Questions of a set in display order
pub async fn fetch_questions(pool: &SqlitePool, set_id: &str) -> Result<Vec<Question>, ApiError> {
    let rows = sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM questions WHERE question_set_id = ? ORDER BY position ASC",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, question_set_id = %set_id, "Database error fetching questions");
        ApiError::DatabaseError(e)
    })?;

    rows.into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::InternalServer)
}

/// Load a set and check that `employer_id` owns it
pub async fn fetch_owned_set(
    pool: &SqlitePool,
    set_id: &str,
    authed: &AuthedUser,
) -> Result<QuestionSet, ApiError> {
    let set = sqlx::query_as::<_, QuestionSet>("SELECT * FROM question_sets WHERE id = ?")
        .bind(set_id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Question set not found".to_string()))?;

    if set.employer_id != authed.id && !authed.is_admin {
        warn!(user_id = %authed.id, question_set_id = %set_id, "Question set access denied");
        return Err(ApiError::Forbidden(
            "You can only use your own question sets".to_string(),
        ));
    }

    Ok(set)
}

/// POST /api/employer/question-sets
pub async fn create_question_set(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateQuestionSetRequest>,
) -> Result<(StatusCode, Json<QuestionSetWithQuestions>), ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let validation = QuestionSetValidator.validate(&request);
    if !validation.is_valid {
        warn!(errors = ?validation.errors, "Question set validation failed");
        return Err(validation.into());
    }

    let set_id = {
        // one lease covers the set id and every question id
        let _lease = state.ids.lease().await;
        let mut tx = state.db.begin().await.map_err(ApiError::DatabaseError)?;

        let set_id = next_entity_id(&mut tx, EntityPrefix::QuestionSet)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query("INSERT INTO question_sets (id, employer_id, name) VALUES (?, ?, ?)")
            .bind(&set_id)
            .bind(&authed.id)
            .bind(request.name.trim())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error creating question set");
                ApiError::DatabaseError(e)
            })?;

        for (position, question) in request.questions.iter().enumerate() {
            let kind: QuestionKind = question.kind.parse().map_err(ApiError::BadRequest)?;
            let question_id = next_entity_id(&mut tx, EntityPrefix::Question)
                .await
                .map_err(ApiError::DatabaseError)?;

            let options = if question.options.is_empty() {
                None
            } else {
                let trimmed: Vec<&str> = question.options.iter().map(|o| o.trim()).collect();
                Some(serde_json::to_string(&trimmed).map_err(|e| {
                    ApiError::InternalServer(format!("Failed to encode options: {}", e))
                })?)
            };

            sqlx::query(
                r#"
                INSERT INTO questions (id, question_set_id, prompt, kind, options, required, position)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&question_id)
            .bind(&set_id)
            .bind(question.prompt.trim())
            .bind(kind.as_str())
            .bind(options)
            .bind(question.required)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error creating question");
                ApiError::DatabaseError(e)
            })?;
        }

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        set_id
    };

    info!(
        question_set_id = %set_id,
        employer_id = %authed.id,
        question_count = request.questions.len(),
        "Question set created"
    );

    let set = fetch_owned_set(&state.db, &set_id, &authed).await?;
    let questions = fetch_questions(&state.db, &set_id).await?;
    Ok((StatusCode::CREATED, Json(QuestionSetWithQuestions { set, questions })))
}

/// GET /api/employer/question-sets
pub async fn list_question_sets(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<QuestionSet>>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let sets = sqlx::query_as::<_, QuestionSet>(
        "SELECT * FROM question_sets WHERE employer_id = ? ORDER BY id ASC",
    )
    .bind(&authed.id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    Ok(Json(sets))
}

/// GET /api/employer/question-sets/:id
pub async fn get_question_set(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<QuestionSetWithQuestions>, ApiError> {
    authed.require_employer()?;
    let state = state_lock.read().await.clone();

    let set = fetch_owned_set(&state.db, &id, &authed).await?;
    let questions = fetch_questions(&state.db, &id).await?;
    Ok(Json(QuestionSetWithQuestions { set, questions }))
}
