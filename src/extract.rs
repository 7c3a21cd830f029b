//! Article fetching and HTML-to-text extraction for the live summarizer.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Pages that render to fewer characters than this are treated as
/// unextractable (login walls, bot interstitials, empty shells).
const MIN_CONTENT_CHARS: usize = 100;

/// Fetch a page and reduce it to readable text.
///
/// Follows redirects, honors the configured timeout, and fails on
/// non-success HTTP status. The returned text is untruncated; the
/// summarizer bounds what it actually sends to the API.
pub async fn fetch_article_text(url: &str, timeout_secs: u64) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Fetch of {} returned HTTP {}", url, status);
    }

    let html = response.text().await?;
    let text = html_to_text(&html)?;

    let trimmed = text.trim();
    if trimmed.len() < MIN_CONTENT_CHARS {
        bail!(
            "Insufficient content extracted from {} (got {} chars)",
            url,
            trimmed.len()
        );
    }

    Ok(trimmed.to_string())
}

/// Render HTML to plain text at a fixed wrap width.
pub fn html_to_text(html: &str) -> Result<String> {
    html2text::from_read(html.as_bytes(), 100)
        .map_err(|e| anyhow::anyhow!("Failed to render HTML to text: {}", e))
}
