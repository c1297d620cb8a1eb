// src/common/id_generator.rs
//! Sequential ID allocator
//!
//! Generates human-readable, prefixed IDs with a zero-padded counter.
//! Format: PREFIX + 7 digits (e.g., JOB0000001 for jobs)
//!
//! The next number is derived from the identifiers already stored, so the
//! sequence stays gap-free as long as rows are never deleted and reused out
//! of order.

use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Width of the numeric suffix used by every entity
pub const ID_WIDTH: usize = 7;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityPrefix {
    /// User account (USR)
    User,
    /// Job posting (JOB)
    Job,
    /// Application (APP)
    Application,
    /// Interview (INT)
    Interview,
    /// Question set (QST)
    QuestionSet,
    /// Question (QUE)
    Question,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "USR",
            EntityPrefix::Job => "JOB",
            EntityPrefix::Application => "APP",
            EntityPrefix::Interview => "INT",
            EntityPrefix::QuestionSet => "QST",
            EntityPrefix::Question => "QUE",
        }
    }

    /// Table whose `id` column holds identifiers with this prefix
    fn table(&self) -> &'static str {
        match self {
            EntityPrefix::User => "users",
            EntityPrefix::Job => "jobs",
            EntityPrefix::Application => "applications",
            EntityPrefix::Interview => "interviews",
            EntityPrefix::QuestionSet => "question_sets",
            EntityPrefix::Question => "questions",
        }
    }
}

/// Compute the next identifier for `prefix` given the identifiers in use
///
/// Only identifiers that start with `prefix` and are exactly
/// `prefix.len() + width` long take part; a suffix that does not parse counts
/// as 0.
///
/// # Example
/// ```ignore
/// let next = next_id("JOB", ["JOB0000041", "JOB0000042"], 7);
/// assert_eq!(next, "JOB0000043");
/// ```
pub fn next_id<I, S>(prefix: &str, existing_ids: I, width: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let expected_len = prefix.len() + width;

    let max = existing_ids
        .into_iter()
        .filter_map(|id| {
            let id = id.as_ref();
            if id.len() != expected_len || !id.starts_with(prefix) {
                return None;
            }
            Some(id[prefix.len()..].parse::<u64>().unwrap_or(0))
        })
        .max()
        .unwrap_or(0);

    format!("{}{:0width$}", prefix, max + 1, width = width)
}

/// Read the identifiers already stored for `prefix` and compute the next one
///
/// Must run on the same connection/transaction as the insert that uses the
/// returned id, while the caller holds an [`IdAllocator`] lease.
pub async fn next_entity_id(
    conn: &mut SqliteConnection,
    prefix: EntityPrefix,
) -> Result<String, sqlx::Error> {
    let query = format!("SELECT id FROM {} WHERE id LIKE ?", prefix.table());
    let existing: Vec<String> = sqlx::query_scalar(&query)
        .bind(format!("{}%", prefix.as_str()))
        .fetch_all(&mut *conn)
        .await?;

    let id = next_id(prefix.as_str(), &existing, ID_WIDTH);
    debug!(prefix = prefix.as_str(), existing = existing.len(), id = %id, "Allocated sequential id");
    Ok(id)
}

/// Serializes id allocation inside this process
///
/// Hold the lease from reading the current maximum until the insert that uses
/// the new id has committed. The primary key still rejects duplicates written
/// by another process.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    gate: Arc<Mutex<()>>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lease(&self) -> OwnedMutexGuard<()> {
        self.gate.clone().lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_first_id_when_empty() {
        let existing: Vec<String> = Vec::new();
        assert_eq!(next_id("JOB", &existing, 7), "JOB0000001");
    }

    #[test]
    fn test_increments_past_max() {
        let existing = vec!["JOB0000003", "JOB0000042", "JOB0000017"];
        assert_eq!(next_id("JOB", &existing, 7), "JOB0000043");
    }

    #[test]
    fn test_ignores_other_prefixes_and_lengths() {
        let existing = vec![
            "APP0000099",
            "JOB00000500",  // one digit too many
            "JOB000050",    // one digit short
            "job0000077",   // prefix is case-sensitive
            "JOB0000005",
        ];
        assert_eq!(next_id("JOB", &existing, 7), "JOB0000006");
    }

    #[test]
    fn test_unparseable_suffix_counts_as_zero() {
        let existing = vec!["JOBABCDEFG", "JOB00x0001"];
        assert_eq!(next_id("JOB", &existing, 7), "JOB0000001");

        let existing = vec!["JOBABCDEFG", "JOB0000002"];
        assert_eq!(next_id("JOB", &existing, 7), "JOB0000003");
    }

    #[test]
    fn test_does_not_mutate_input_and_is_repeatable() {
        let existing = vec!["INT0000009".to_string(), "INT0000010".to_string()];
        let snapshot = existing.clone();

        let first = next_id("INT", &existing, 7);
        let second = next_id("INT", &existing, 7);

        assert_eq!(first, "INT0000011");
        assert_eq!(first, second);
        assert_eq!(existing, snapshot);
    }

    #[test]
    fn test_custom_width() {
        let existing = vec!["Q009", "Q010"];
        assert_eq!(next_id("Q", &existing, 3), "Q011");
    }

    #[test]
    fn test_all_prefixes_are_distinct() {
        let prefixes = [
            EntityPrefix::User,
            EntityPrefix::Job,
            EntityPrefix::Application,
            EntityPrefix::Interview,
            EntityPrefix::QuestionSet,
            EntityPrefix::Question,
        ];
        let unique: std::collections::HashSet<&str> =
            prefixes.iter().map(|p| p.as_str()).collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[tokio::test]
    async fn test_next_entity_id_reads_table() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE question_sets (id TEXT PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(
            next_entity_id(&mut conn, EntityPrefix::QuestionSet).await.unwrap(),
            "QST0000001"
        );

        sqlx::query("INSERT INTO question_sets (id) VALUES ('QST0000001'), ('QST0000002')")
            .execute(&mut *conn)
            .await
            .unwrap();
        assert_eq!(
            next_entity_id(&mut conn, EntityPrefix::QuestionSet).await.unwrap(),
            "QST0000003"
        );
    }
}
