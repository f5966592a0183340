//! HTTP request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::error::ApiError;
use super::gateway::Gateway;
use super::streaming::ndjson_response;
use super::types::{
    flatten_messages, ChatMessage, ChatRequest, ChatResponse, DeleteRequest, GenerateRequest,
    GenerateResponse, ListResponse, ModelInfo,
};
use crate::engine::GenerateOptions;
use crate::health::HealthReport;
use crate::models::ResolveError;
use crate::shutdown::{RequestGuard, ShutdownCoordinator};
use crate::telemetry::{self, RequestSpan, SpanExt};

/// Shared application state.
pub struct AppState {
    pub gateway: Gateway,
    pub shutdown: ShutdownCoordinator,
}

impl AppState {
    pub fn new(gateway: Gateway, shutdown: ShutdownCoordinator) -> Self {
        Self { gateway, shutdown }
    }
}

/// `POST /api/generate`
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.model.is_empty() {
        return Err(ApiError::Input("model is required".into()));
    }
    if request.prompt.is_empty() {
        return Err(ApiError::Input("prompt is required".into()));
    }
    let guard = state.shutdown.track().ok_or(ApiError::Unavailable)?;

    let span = request_span("generate", &request.model, request.stream);
    let started = Instant::now();
    let result = run_generate(&state.gateway, request, guard)
        .instrument(span.clone())
        .await;
    finish(&span, "generate", started, &result);
    result
}

async fn run_generate(
    gateway: &Gateway,
    request: GenerateRequest,
    guard: RequestGuard,
) -> Result<Response, ApiError> {
    let options = request.options();
    let model = request.model;

    if request.stream {
        let units = gateway
            .generate_stream(&model, request.prompt, options)
            .await
            .map_err(ApiError::from_generation)?;
        return Ok(ndjson_response(units, guard, move |unit, done| {
            GenerateResponse {
                model: model.clone(),
                response: unit,
                done,
            }
        }));
    }

    let text = gateway
        .generate(&model, request.prompt, options)
        .await
        .map_err(ApiError::from_generation)?;
    drop(guard);
    Ok(Json(GenerateResponse {
        model,
        response: text,
        done: true,
    })
    .into_response())
}

/// `POST /api/chat`
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.model.is_empty() {
        return Err(ApiError::Input("model is required".into()));
    }
    if request.messages.is_empty() {
        return Err(ApiError::Input("messages are required".into()));
    }
    let guard = state.shutdown.track().ok_or(ApiError::Unavailable)?;

    let span = request_span("chat", &request.model, request.stream);
    let started = Instant::now();
    let result = run_chat(&state.gateway, request, guard)
        .instrument(span.clone())
        .await;
    finish(&span, "chat", started, &result);
    result
}

async fn run_chat(
    gateway: &Gateway,
    request: ChatRequest,
    guard: RequestGuard,
) -> Result<Response, ApiError> {
    let prompt = flatten_messages(&request.messages);
    let options = GenerateOptions::default();
    let model = request.model;

    if request.stream {
        let units = gateway
            .generate_stream(&model, prompt, options)
            .await
            .map_err(ApiError::from_generation)?;
        return Ok(ndjson_response(units, guard, move |unit, done| ChatResponse {
            model: model.clone(),
            message: ChatMessage::assistant(unit),
            done,
        }));
    }

    let text = gateway
        .generate(&model, prompt, options)
        .await
        .map_err(ApiError::from_generation)?;
    drop(guard);
    Ok(Json(ChatResponse {
        model,
        message: ChatMessage::assistant(text),
        done: true,
    })
    .into_response())
}

/// `GET /api/tags`
pub async fn tags(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>, ApiError> {
    let manifests = state
        .gateway
        .resolver()
        .list()
        .map_err(|e| ApiError::Internal(format!("failed to list models: {}", e)))?;
    Ok(Json(ListResponse {
        models: manifests.into_iter().map(ModelInfo::from).collect(),
    }))
}

/// `DELETE /api/delete`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    if request.name.is_empty() {
        return Err(ApiError::Input("name is required".into()));
    }

    match state.gateway.resolver().remove(&request.name) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) if e.is_not_found() || matches!(e, ResolveError::InvalidName(_)) => {
            Err(ApiError::NotFound(format!("model not found: {}", e)))
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport::new(
        state.shutdown.state(),
        &state.gateway.engine_state(),
    ))
}

fn request_span(operation: &str, model: &str, stream: bool) -> Span {
    let request_id = Uuid::new_v4().to_string();
    let span = RequestSpan::new(&request_id, operation, model);
    span.record("stream", stream);
    span
}

fn finish<T>(span: &Span, operation: &'static str, started: Instant, result: &Result<T, ApiError>) {
    let elapsed = started.elapsed();
    span.record_result(result);
    span.record("latency_ms", elapsed.as_millis() as u64);
    match result {
        Ok(_) => telemetry::record_request_success(operation, elapsed),
        Err(e) => telemetry::record_request_failure(operation, e.kind()),
    }
}
