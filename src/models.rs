//! Core data types for summary records.
//!
//! A [`Summary`] is one persisted URL submission and its (possibly pending)
//! summarization result. Records move through a small state machine tracked
//! by [`SummaryStatus`].

use serde::Serialize;

/// Lifecycle state of a summary record.
///
/// ```text
/// pending ──▶ processing ──▶ completed
///                  │
///                  └────────▶ failed
/// ```
///
/// `Completed` and `Failed` are terminal. In-flight work is never cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Pending => "pending",
            SummaryStatus::Processing => "processing",
            SummaryStatus::Completed => "completed",
            SummaryStatus::Failed => "failed",
        }
    }

    /// Parse a status stored in the database. Unknown values map to
    /// `Pending` rather than failing the whole row read.
    pub fn parse(s: &str) -> SummaryStatus {
        match s {
            "processing" => SummaryStatus::Processing,
            "completed" => SummaryStatus::Completed,
            "failed" => SummaryStatus::Failed,
            _ => SummaryStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SummaryStatus::Completed | SummaryStatus::Failed)
    }
}

/// A summary record as stored in SQLite.
#[derive(Debug, Clone)]
pub struct Summary {
    pub id: i64,
    pub url: String,
    pub summary: String,
    pub status: SummaryStatus,
    pub created_at: i64,
}

impl Summary {
    /// ISO8601 rendering of the creation timestamp for API responses.
    pub fn created_at_iso(&self) -> String {
        chrono::DateTime::from_timestamp(self.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| self.created_at.to_string())
    }
}
