use super::model::{InsertOutcome, Submission};
use crate::model::SubmissionKind;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, ensure the parent directory exists.
/// Leaves in-memory URLs and non-sqlite schemes untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    if let Some(parent) = std::path::Path::new(path_part).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(path_part);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert a submission keyed by the queue-assigned message id.
///
/// A uniqueness violation on `(kind, sqs_message_id)` means the queue
/// redelivered a message we already persisted; that is reported as
/// `InsertOutcome::Duplicate`, not as an error. Any other database failure
/// propagates.
#[instrument(skip_all, fields(kind = kind.as_str(), message_id = message_id))]
pub async fn insert_submission(
    pool: &Pool,
    kind: SubmissionKind,
    message_id: &str,
    data: &Value,
) -> Result<InsertOutcome> {
    let res = sqlx::query(
        "INSERT INTO submissions (kind, sqs_message_id, data) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(kind.as_str())
    .bind(message_id)
    .bind(data.to_string())
    .fetch_one(pool)
    .await;

    match res {
        Ok(row) => Ok(InsertOutcome::Inserted(row.get("id"))),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Ok(InsertOutcome::Duplicate)
        }
        Err(err) => Err(err.into()),
    }
}

#[instrument(skip_all)]
pub async fn fetch_by_message_id(
    pool: &Pool,
    kind: SubmissionKind,
    message_id: &str,
) -> Result<Option<Submission>> {
    let row = sqlx::query(
        "SELECT id, kind, sqs_message_id, data, created_at FROM submissions \
         WHERE kind = ? AND sqs_message_id = ?",
    )
    .bind(kind.as_str())
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let kind_str: String = row.get("kind");
    let kind = kind_str
        .parse::<SubmissionKind>()
        .map_err(|_| anyhow!("submission has unknown kind {}", kind_str))?;
    let raw: String = row.get("data");
    let data: Value = serde_json::from_str(&raw)?;
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(Some(Submission {
        id: row.get("id"),
        kind,
        sqs_message_id: row.get("sqs_message_id"),
        data,
        created_at,
    }))
}

#[instrument(skip_all)]
pub async fn count_submissions(pool: &Pool, kind: SubmissionKind) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE kind = ?")
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
