//! Database operations for summary records.
//!
//! Every function acquires a connection from the shared pool for the
//! duration of one statement; no transaction spans multiple operations.
//! The worker-side transitions ([`mark_processing`], [`complete_summary`],
//! [`fail_summary`]) run in their own sessions, independent of any request.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::{Summary, SummaryStatus};

/// Insert a new pending record with an empty summary and return it.
pub async fn create_summary(pool: &SqlitePool, url: &str) -> Result<Summary> {
    let created_at = Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO summaries (url, summary, status, created_at) VALUES (?, '', 'pending', ?)",
    )
    .bind(url)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(Summary {
        id: result.last_insert_rowid(),
        url: url.to_string(),
        summary: String::new(),
        status: SummaryStatus::Pending,
        created_at,
    })
}

pub async fn get_summary(pool: &SqlitePool, id: i64) -> Result<Option<Summary>> {
    let row = sqlx::query("SELECT id, url, summary, status, created_at FROM summaries WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row_to_summary(&row)))
}

/// All records in creation order.
pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<Summary>> {
    let rows =
        sqlx::query("SELECT id, url, summary, status, created_at FROM summaries ORDER BY id ASC")
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(row_to_summary).collect())
}

/// Delete a record. Returns false when no row matched.
pub async fn delete_summary(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM summaries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Worker transition: record picked up for summarization.
pub async fn mark_processing(pool: &SqlitePool, id: i64) -> Result<bool> {
    set_status(pool, id, SummaryStatus::Processing).await
}

/// Worker transition: summarization produced text.
pub async fn complete_summary(pool: &SqlitePool, id: i64, summary: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE summaries SET summary = ?, status = 'completed' WHERE id = ?")
        .bind(summary)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Worker transition: all attempts exhausted. The failure note is stored
/// in the summary column so it is visible when polling the record.
pub async fn fail_summary(pool: &SqlitePool, id: i64, note: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE summaries SET summary = ?, status = 'failed' WHERE id = ?")
        .bind(note)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Row counts per status, for the `stats` command.
pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        "SELECT status, COUNT(*) AS n FROM summaries GROUP BY status ORDER BY status ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("status"), row.get("n")))
        .collect())
}

async fn set_status(pool: &SqlitePool, id: i64, status: SummaryStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE summaries SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Summary {
    let status: String = row.get("status");
    Summary {
        id: row.get("id"),
        url: row.get("url"),
        summary: row.get("summary"),
        status: SummaryStatus::parse(&status),
        created_at: row.get("created_at"),
    }
}
