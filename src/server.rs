//! HTTP API server.
//!
//! Exposes the context-event and suggestion pipeline over a JSON HTTP API,
//! plus a Server-Sent Events stream for real-time delivery.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/context` | Submit a context event for a subject |
//! | `GET`  | `/api/context/current/{subject}` | Most recent live context |
//! | `GET`  | `/api/context/activity/{subject}` | Paged activity history |
//! | `GET`  | `/api/context/search` | Full-text search over past context |
//! | `GET`  | `/api/context/analytics/{subject}` | Per-subject activity breakdown |
//! | `POST` | `/api/suggestions/generate` | On-demand analysis of an event |
//! | `GET`  | `/api/suggestions/realtime/{subject}` | Analyze the live context (polling fallback) |
//! | `POST` | `/api/suggestions/{id}/feedback` | Record a feedback verdict |
//! | `GET`  | `/api/suggestions/history/{subject}` | Paged suggestion log |
//! | `GET`  | `/api/suggestions/analytics` | 7-day suggestion analytics |
//! | `GET`  | `/api/events` | SSE stream of real-time events |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "unknown suggestion id" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! dashboards.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::distribute::Distributor;
use crate::events::{should_deliver, Broadcaster};
use crate::migrate;
use crate::models::{Analysis, ContextEvent, Feedback};
use crate::oracle::FtsOracle;
use crate::rank::Ranker;
use crate::store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    distributor: Distributor,
    scope_events_to_subject: bool,
}

/// Starts the HTTP server. Connects the database, applies migrations, and
/// runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let oracle = Arc::new(FtsOracle::new(pool.clone()));
    let ranker = Ranker::new(oracle, &config.engine);
    let broadcaster = Broadcaster::new(config.server.channel_capacity);
    let distributor = Distributor::new(pool, ranker, broadcaster, &config.engine);

    let state = AppState {
        distributor,
        scope_events_to_subject: config.server.scope_events_to_subject,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/context", post(handle_submit_context))
        .route("/api/context/current/{subject}", get(handle_current_context))
        .route("/api/context/activity/{subject}", get(handle_activity_history))
        .route("/api/context/search", get(handle_context_search))
        .route("/api/context/analytics/{subject}", get(handle_activity_analytics))
        .route("/api/suggestions/generate", post(handle_generate))
        .route("/api/suggestions/realtime/{subject}", get(handle_realtime))
        .route("/api/suggestions/{id}/feedback", post(handle_feedback))
        .route("/api/suggestions/history/{subject}", get(handle_suggestion_history))
        .route("/api/suggestions/analytics", get(handle_analytics))
        .route("/api/events", get(handle_events))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(bind = %config.server.bind, "docsense server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ POST /api/context ============

#[derive(Deserialize)]
struct SubmitRequest {
    subject_id: String,
    #[serde(default)]
    session_id: Option<String>,
    event: ContextEvent,
}

#[derive(Serialize)]
struct SubmitResponse {
    activity_id: String,
    ranking_queued: bool,
}

async fn handle_submit_context(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    if req.subject_id.trim().is_empty() {
        return Err(bad_request("subject_id must not be empty"));
    }

    let outcome = state
        .distributor
        .submit(&req.subject_id, req.session_id.as_deref(), req.event)
        .await
        .map_err(internal)?;

    Ok(Json(SubmitResponse {
        activity_id: outcome.activity_id,
        ranking_queued: outcome.ranking_queued,
    }))
}

// ============ GET /api/context/current/{subject} ============

async fn handle_current_context(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<ContextEvent>, AppError> {
    state
        .distributor
        .current_context(&subject)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("no live context for subject: {}", subject)))
}

// ============ GET /api/context/activity/{subject} ============

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    #[serde(default)]
    kind: Option<String>,
}

fn default_limit() -> i64 {
    50
}

async fn handle_activity_history(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let records = store::activity_history(
        state.distributor.pool(),
        &subject,
        query.limit.clamp(1, 500),
        query.offset.max(0),
        query.kind.as_deref(),
    )
    .await
    .map_err(internal)?;

    Ok(Json(serde_json::json!({ "activities": records })))
}

// ============ GET /api/context/search ============

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

async fn handle_context_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if query.q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }

    let records = store::search_context(
        state.distributor.pool(),
        &query.q,
        query.subject_id.as_deref(),
        query.kind.as_deref(),
    )
    .await
    .map_err(internal)?;

    Ok(Json(serde_json::json!({ "results": records })))
}

// ============ POST /api/suggestions/generate ============

#[derive(Deserialize)]
struct GenerateRequest {
    subject_id: String,
    event: ContextEvent,
}

#[derive(Serialize)]
struct GenerateResponse {
    cached: bool,
    fingerprint: String,
    #[serde(flatten)]
    analysis: Analysis,
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if req.subject_id.trim().is_empty() {
        return Err(bad_request("subject_id must not be empty"));
    }

    let generated = state
        .distributor
        .generate(&req.subject_id, &req.event)
        .await
        .map_err(internal)?;

    Ok(Json(GenerateResponse {
        cached: generated.cached,
        fingerprint: generated.fingerprint,
        analysis: generated.analysis,
    }))
}

// ============ GET /api/suggestions/realtime/{subject} ============

/// Polling fallback for clients without an SSE connection: analyze the
/// subject's most recent live context on demand. 404 when no live context
/// is within TTL.
async fn handle_realtime(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<GenerateResponse>, AppError> {
    let event = state
        .distributor
        .current_context(&subject)
        .await
        .ok_or_else(|| not_found(format!("no live context for subject: {}", subject)))?;

    let generated = state
        .distributor
        .generate(&subject, &event)
        .await
        .map_err(internal)?;

    Ok(Json(GenerateResponse {
        cached: generated.cached,
        fingerprint: generated.fingerprint,
        analysis: generated.analysis,
    }))
}

// ============ POST /api/suggestions/{id}/feedback ============

#[derive(Deserialize)]
struct FeedbackRequest {
    subject_id: String,
    /// Deserialization rejects anything outside the verdict enum, which is
    /// how malformed feedback becomes a 422 before any side effects.
    feedback: Feedback,
}

async fn handle_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = state
        .distributor
        .feedback(&id, &req.subject_id, req.feedback)
        .await
        .map_err(internal)?;

    if !found {
        return Err(not_found(format!("unknown suggestion id: {}", id)));
    }

    Ok(Json(serde_json::json!({ "recorded": true })))
}

// ============ GET /api/context/analytics/{subject} ============

#[derive(Deserialize)]
struct ActivityAnalyticsQuery {
    #[serde(default = "default_analytics_days")]
    days: i64,
}

fn default_analytics_days() -> i64 {
    7
}

async fn handle_activity_analytics(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<ActivityAnalyticsQuery>,
) -> Result<Json<store::ActivityReport>, AppError> {
    store::activity_analytics(
        state.distributor.pool(),
        &subject,
        query.days.clamp(1, 365),
    )
    .await
    .map(Json)
    .map_err(internal)
}

// ============ GET /api/suggestions/history/{subject} ============

async fn handle_suggestion_history(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let records = store::suggestion_history(
        state.distributor.pool(),
        &subject,
        query.limit.clamp(1, 500),
        query.offset.max(0),
    )
    .await
    .map_err(internal)?;

    Ok(Json(serde_json::json!({ "suggestions": records })))
}

// ============ GET /api/suggestions/analytics ============

async fn handle_analytics(
    State(state): State<AppState>,
) -> Result<Json<store::AnalyticsReport>, AppError> {
    store::suggestion_analytics(state.distributor.pool())
        .await
        .map(Json)
        .map_err(internal)
}

// ============ GET /api/events (SSE) ============

#[derive(Deserialize)]
struct EventsQuery {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    subject_id: Option<String>,
}

/// SSE stream of `new-context` and `suggestions-update` events.
///
/// Each connection is a session; pass `session_id` to keep an identity
/// across reconnects (otherwise one is generated). Delivery is filtered per
/// session: an originating session never sees its own `new-context` back,
/// and with subject scoping enabled a session only sees events for its
/// declared `subject_id`. Lagged connections silently skip dropped events.
async fn handle_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let session_id = query
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let subject_id = query.subject_id;
    let scope = state.scope_events_to_subject;
    let rx = state.distributor.broadcaster().subscribe();

    info!(session_id, subject = ?subject_id, "event stream connected");

    let stream = BroadcastStream::new(rx).filter_map(move |published| {
        let published = published.ok()?;
        if !should_deliver(&published, &session_id, subject_id.as_deref(), scope) {
            return None;
        }
        let data = serde_json::to_string(&published.event).ok()?;
        Some(Ok(SseEvent::default().data(data)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
