//! Database statistics overview.
//!
//! Quick summary of what's stored: record counts by status and the age of
//! the most recent submission. Used by `pagesum stats` to spot stuck
//! records (e.g. a growing `failed` count) without querying by hand.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::crud;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let counts = crud::count_by_status(&pool).await?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();

    let newest_ts: Option<i64> = sqlx::query("SELECT MAX(created_at) AS ts FROM summaries")
        .fetch_one(&pool)
        .await?
        .get("ts");

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("pagesum — Database Stats");
    println!("========================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!("  Records:   {}", total);
    println!(
        "  Newest:    {}",
        match newest_ts {
            Some(ts) => format_ts_relative(ts),
            None => "none".to_string(),
        }
    );

    if !counts.is_empty() {
        println!();
        println!("  {:<12} {:>8}", "STATUS", "COUNT");
        println!("  {}", "-".repeat(21));
        for (status, n) in &counts {
            println!("  {:<12} {:>8}", status, n);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}
