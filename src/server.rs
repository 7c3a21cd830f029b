//! JSON HTTP API for the summary service.
//!
//! Thin mapping of the CRUD and lifecycle operations onto routes. The
//! create handler returns as soon as the record exists; summarization
//! happens on the background worker queue.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/summaries` | Create a record and enqueue summarization |
//! | `GET`  | `/summaries` | List all records in creation order |
//! | `GET`  | `/summaries/{id}` | Fetch one record |
//! | `DELETE` | `/summaries/{id}` | Delete one record |
//! | `GET`  | `/ping` | Process liveness |
//! | `GET`  | `/health` | Readiness incl. database connectivity |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "validation_error", "message": "invalid url" } }
//! ```
//!
//! Error codes: `validation_error` (422), `not_found` (404),
//! `database_error` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::crud;
use crate::db;
use crate::models::Summary;
use crate::worker::{JobQueue, SummaryJob};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    queue: JobQueue,
}

/// Starts the HTTP server on the configured bind address.
///
/// Runs until the process receives ctrl-c, then returns so the caller can
/// drain the worker queue. The pool and queue are constructed by the
/// caller; this function owns neither.
pub async fn run_server(config: &Config, pool: SqlitePool, queue: JobQueue) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        queue,
    };

    let app = build_router(state);

    tracing::info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/summaries", post(handle_create).get(handle_list))
        .route("/summaries/{id}", get(handle_get).delete(handle_delete))
        .route("/ping", get(handle_ping))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"validation_error"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 422 Unprocessable Entity error for malformed input.
fn validation_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "validation_error".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for database failures on the request path.
fn database_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "database operation failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "database_error".to_string(),
        message: err.to_string(),
    }
}

// ============ Request / response schemas ============

#[derive(Deserialize)]
struct CreateSummaryRequest {
    url: String,
}

#[derive(Serialize)]
struct SummaryResponse {
    id: i64,
    url: String,
    status: String,
    summary: String,
    created_at: String,
}

impl From<&Summary> for SummaryResponse {
    fn from(summary: &Summary) -> Self {
        Self {
            id: summary.id,
            url: summary.url.clone(),
            status: summary.status.as_str().to_string(),
            summary: summary.summary.clone(),
            created_at: summary.created_at_iso(),
        }
    }
}

/// Validate and normalize a submitted URL.
///
/// Requires an absolute http(s) URL with a host. Returns the `url` crate's
/// canonical serialization, which appends a trailing slash to bare-origin
/// URLs (`https://example.com` → `https://example.com/`).
fn normalize_url(raw: &str) -> Result<String, AppError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| validation_error(format!("invalid url '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(validation_error(format!(
                "unsupported url scheme '{}', must be http or https",
                other
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(validation_error(format!("url '{}' has no host", raw)));
    }

    Ok(parsed.to_string())
}

// ============ POST /summaries ============

/// Creates a pending record and enqueues background summarization.
///
/// The response is sent without waiting on summarization. If the worker
/// queue is full the record is immediately marked failed instead of
/// piling up unbounded background work.
async fn handle_create(
    State(state): State<AppState>,
    Json(payload): Json<CreateSummaryRequest>,
) -> Result<(StatusCode, Json<SummaryResponse>), AppError> {
    let url = normalize_url(&payload.url)?;

    let mut summary = crud::create_summary(&state.pool, &url)
        .await
        .map_err(database_error)?;

    tracing::info!(id = summary.id, url = %summary.url, "created summary record");

    let accepted = state.queue.enqueue(SummaryJob {
        id: summary.id,
        url: summary.url.clone(),
    });

    if !accepted {
        let note = "Failed to generate summary: worker queue is full";
        crud::fail_summary(&state.pool, summary.id, note)
            .await
            .map_err(database_error)?;
        summary.status = crate::models::SummaryStatus::Failed;
        summary.summary = note.to_string();
    }

    Ok((StatusCode::CREATED, Json(SummaryResponse::from(&summary))))
}

// ============ GET /summaries/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = crud::get_summary(&state.pool, id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found(format!("no summary with id {}", id)))?;

    Ok(Json(SummaryResponse::from(&summary)))
}

// ============ GET /summaries ============

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<SummaryResponse>>, AppError> {
    let summaries = crud::list_summaries(&state.pool)
        .await
        .map_err(database_error)?;

    Ok(Json(summaries.iter().map(SummaryResponse::from).collect()))
}

// ============ DELETE /summaries/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = crud::delete_summary(&state.pool, id)
        .await
        .map_err(database_error)?;

    if !deleted {
        return Err(not_found(format!("no summary with id {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============ GET /ping ============

/// Process liveness. Echoes environment settings; involves no I/O.
async fn handle_ping(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ping": "pong!",
        "environment": state.config.app.environment,
        "testing": state.config.app.testing,
    }))
}

// ============ GET /health ============

/// Readiness. Verifies database connectivity and reports degraded status
/// with a 503 instead of failing when the database is unreachable.
async fn handle_health(State(state): State<AppState>) -> Response {
    match db::check_connection(&state.pool).await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "database": "connected",
            "environment": state.config.app.environment,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "environment": state.config.app.environment,
                })),
            )
                .into_response()
        }
    }
}
