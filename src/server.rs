//! HTTP surface of the service.

use crate::ai::ChatRequest;
use crate::api::{AnalyzeRequest, IntrospectService, RepoRequest};
use crate::error::{IntrospectError, StageError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared handler state
pub type AppState = Arc<IntrospectService>;

/// JSON error reply: `{"error": ...}`, plus `"stage"` for staged operations
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    stage: Option<&'static str>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            stage: None,
        }
    }
}

impl From<IntrospectError> for ApiError {
    fn from(e: IntrospectError) -> Self {
        let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %e, "request failed");
        }
        Self {
            status,
            message: e.to_string(),
            stage: None,
        }
    }
}

impl From<StageError> for ApiError {
    fn from(e: StageError) -> Self {
        let stage = e.stage.as_str();
        Self {
            stage: Some(stage),
            ..ApiError::from(e.source)
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            stage: self.stage,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Builds the router with CORS and request tracing
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/report/:owner/:repo", get(get_report))
        .route("/api/smart-summary", post(smart_summary))
        .route("/api/file-tree", post(file_tree))
        .route("/api/chat", post(chat))
        .route("/api/voice-chat", post(voice_chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "repo-introspector is online" }))
}

async fn health(State(service): State<AppState>) -> Json<crate::api::HealthStatus> {
    Json(service.health().await)
}

async fn analyze(
    State(service): State<AppState>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<crate::analytics::AnalyticsReport> {
    let Json(request) = payload?;
    Ok(Json(service.analyze(&request).await?))
}

async fn get_report(
    State(service): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<crate::analytics::AnalyticsReport> {
    Ok(Json(service.get_report(&owner, &repo).await?))
}

async fn smart_summary(
    State(service): State<AppState>,
    payload: std::result::Result<Json<RepoRequest>, JsonRejection>,
) -> ApiResult<crate::ai::SmartSummary> {
    let Json(request) = payload?;
    Ok(Json(service.smart_summary(&request).await?))
}

async fn file_tree(
    State(service): State<AppState>,
    payload: std::result::Result<Json<RepoRequest>, JsonRejection>,
) -> ApiResult<crate::api::FileTreeResponse> {
    let Json(request) = payload?;
    Ok(Json(service.file_tree(&request).await?))
}

async fn chat(
    State(service): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<crate::ai::ChatResponse> {
    let Json(request) = payload?;
    Ok(Json(service.chat(&request).await?))
}

async fn voice_chat(
    State(service): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<crate::ai::VoiceChatResponse> {
    let Json(request) = payload?;
    Ok(Json(service.voice_chat(&request).await?))
}
