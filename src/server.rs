// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface.
//
// Responsibilities:
// - Route both wire protocols (OpenAI chat completions, Anthropic
//   Messages) onto the shared gate -> cache -> queue pipeline.
// - Replay queued completions as JSON or SSE, including the Anthropic
//   heartbeat pings while a streaming request waits its turn.
// - Render every failure in the wire shape the caller speaks.

use crate::cache::ResponseCache;
use crate::catalog::ModelCatalog;
use crate::completer::CompleterError;
use crate::config::RuntimeConfig;
use crate::gate::{Gate, GateError};
use crate::openai::{ChatCompletionChunk, ChatCompletionsPayload};
use crate::passthrough::{self, PassthroughError};
use crate::queue::{Completion, DispatchQueue};
use crate::synth::{build_non_streaming, build_streaming, BuildOptions};
use crate::translate::{self, ping_event, AnthropicEvent, StreamState, TranslateError};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Interval between heartbeat pings on a waiting Anthropic stream.
const PING_INTERVAL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// State and router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub queue: DispatchQueue,
    pub gate: Arc<Gate>,
    pub cache: Arc<ResponseCache>,
    pub catalog: Arc<ModelCatalog>,
    pub config: Arc<RuntimeConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            json_mode: self.config.json_mode,
            chunk_size: self.config.chunk_size,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // The server is called by arbitrary local tooling, browser clients
    // included, so every route allows cross-origin access.
    Router::new()
        .route("/", get(root))
        .route("/chat/completions", post(chat_completions))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/messages", post(messages))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/models", get(models))
        .route("/v1/models", get(models))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which wire shape a failure should be rendered in.
#[derive(Debug, Clone, Copy)]
enum Wire {
    OpenAi,
    Anthropic,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("invalid payload: {0}")]
    Translate(#[from] TranslateError),
    #[error("invalid payload: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Completer(#[from] CompleterError),
    #[error(transparent)]
    Passthrough(#[from] PassthroughError),
    #[error("queue worker is no longer running")]
    WorkerGone,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Gate(GateError::Rejected) => StatusCode::FORBIDDEN,
            ApiError::Gate(GateError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Translate(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Completer(_) | ApiError::Passthrough(_) => StatusCode::BAD_GATEWAY,
            ApiError::WorkerGone => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self, wire: Wire) -> &'static str {
        match (self, wire) {
            (ApiError::Gate(GateError::Rejected), Wire::OpenAi) => "invalid_request_error",
            (ApiError::Gate(GateError::Rejected), Wire::Anthropic) => "permission_error",
            (ApiError::Gate(GateError::RateLimited { .. }), _) => "rate_limit_error",
            (ApiError::Translate(_) | ApiError::BadRequest(_), _) => "invalid_request_error",
            (_, Wire::OpenAi) => "server_error",
            (_, Wire::Anthropic) => "api_error",
        }
    }

    /// Render in the given wire shape.
    fn render(self, wire: Wire) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match wire {
            Wire::OpenAi => json!({
                "error": {
                    "message": message,
                    "type": self.error_type(wire),
                    "param": null,
                    "code": null
                }
            }),
            Wire::Anthropic => json!({
                "type": "error",
                "error": {
                    "type": self.error_type(wire),
                    "message": message
                }
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::Gate(GateError::RateLimited { retry_after_ms }) = self {
            let seconds = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        tracing::warn!(status = %status, error = %message, "request failed");
        response
    }
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

/// Gate, cache, and queue for one typed payload. Returns the shaped
/// completion regardless of which protocol the request arrived on.
async fn complete_via_pipeline(
    state: &AppState,
    payload: ChatCompletionsPayload,
) -> Result<Completion, ApiError> {
    let opts = state.build_options();

    if let Some(answer) = payload
        .system_text()
        .and_then(|text| state.cache.lookup(&text))
    {
        return Ok(if payload.stream {
            Completion::Stream(build_streaming(&payload, &answer, &opts))
        } else {
            Completion::Full(build_non_streaming(&payload, &answer, &opts))
        });
    }

    let rx = state.queue.enqueue(payload).await;
    let result = rx.await.map_err(|_| ApiError::WorkerGone)?;
    Ok(result?)
}

// ---------------------------------------------------------------------------
// OpenAI surface
// ---------------------------------------------------------------------------

async fn chat_completions(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    match chat_completions_inner(state, body).await {
        Ok(response) => response,
        Err(err) => err.render(Wire::OpenAi),
    }
}

async fn chat_completions_inner(state: AppState, body: Value) -> Result<Response, ApiError> {
    state.gate.admit().await?;

    if passthrough::is_proxied_model(&body) {
        let response = passthrough::forward(
            &state.http,
            &state.config.proxy_upstream,
            state.config.proxy_api_key.as_deref(),
            body,
        )
        .await?;
        return Ok(response);
    }

    let payload: ChatCompletionsPayload =
        serde_json::from_value(body).map_err(|err| ApiError::BadRequest(err.to_string()))?;

    match complete_via_pipeline(&state, payload).await? {
        Completion::Full(resp) => Ok(Json(resp).into_response()),
        Completion::Stream(chunks) => Ok(openai_sse(chunks)),
    }
}

/// Data-only SSE replay of a chunk sequence. No terminal sentinel is
/// sent; the stream simply closes after the finish-reason chunk.
fn openai_sse(chunks: Vec<ChatCompletionChunk>) -> Response {
    let events = futures_util::stream::iter(chunks)
        .map(|chunk| Event::default().json_data(&chunk));
    Sse::new(events).into_response()
}

// ---------------------------------------------------------------------------
// Anthropic surface
// ---------------------------------------------------------------------------

async fn messages(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    match messages_inner(state, body).await {
        Ok(response) => response,
        Err(err) => err.render(Wire::Anthropic),
    }
}

async fn messages_inner(state: AppState, body: Value) -> Result<Response, ApiError> {
    state.gate.admit().await?;

    if passthrough::is_proxied_model(&body) {
        let response = passthrough::forward(
            &state.http,
            &state.config.proxy_upstream,
            state.config.proxy_api_key.as_deref(),
            body,
        )
        .await?;
        return Ok(response);
    }

    let payload = translate::openai_payload_from_anthropic(&body)?;
    let model = payload.model.clone();

    if !payload.stream {
        return match complete_via_pipeline(&state, payload).await? {
            Completion::Full(resp) => {
                Ok(Json(translate::messages_response_from(&resp)).into_response())
            }
            Completion::Stream(_) => Err(ApiError::WorkerGone),
        };
    }

    // Streaming: answer the cache shortcut immediately, otherwise keep the
    // connection warm with pings while the request waits in the queue.
    let opts = state.build_options();
    if let Some(answer) = payload
        .system_text()
        .and_then(|text| state.cache.lookup(&text))
    {
        let chunks = build_streaming(&payload, &answer, &opts);
        return Ok(anthropic_sse_immediate(model, chunks));
    }

    let rx = state.queue.enqueue(payload).await;
    let (tx, events) = mpsc::channel::<Result<Event, Infallible>>(32);

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + PING_INTERVAL, PING_INTERVAL);
        let mut pending = rx;
        let outcome = loop {
            tokio::select! {
                outcome = &mut pending => break outcome,
                _ = ticker.tick() => {
                    if send_event(&tx, ping_event()).await.is_err() {
                        return;
                    }
                }
            }
        };

        match outcome {
            Ok(Ok(Completion::Stream(chunks))) => {
                let mut translator = StreamState::new(model);
                for chunk in &chunks {
                    for event in translator.translate_chunk(chunk) {
                        if send_event(&tx, event).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Ok(Ok(Completion::Full(_))) => {
                tracing::warn!("streaming request resolved to a full completion");
            }
            Ok(Err(err)) => {
                let _ = send_event(&tx, error_event(&ApiError::from(err))).await;
            }
            Err(_) => {
                let _ = send_event(&tx, error_event(&ApiError::WorkerGone)).await;
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(events)).into_response())
}

/// Replay an already-built chunk sequence as Anthropic SSE with no queue
/// wait and therefore no pings.
fn anthropic_sse_immediate(model: String, chunks: Vec<ChatCompletionChunk>) -> Response {
    let mut translator = StreamState::new(model);
    let events: Vec<Result<Event, Infallible>> = chunks
        .iter()
        .flat_map(|chunk| translator.translate_chunk(chunk))
        .filter_map(|event| to_sse_event(event).map(Ok))
        .collect();
    Sse::new(futures_util::stream::iter(events)).into_response()
}

fn to_sse_event(event: AnthropicEvent) -> Option<Event> {
    match Event::default().event(event.name).json_data(&event.data) {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::error!(error = %err, event = event.name, "failed to encode stream event");
            None
        }
    }
}

async fn send_event(
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    event: AnthropicEvent,
) -> Result<(), ()> {
    match to_sse_event(event) {
        Some(sse) => tx.send(Ok(sse)).await.map_err(|_| ()),
        None => Ok(()),
    }
}

fn error_event(err: &ApiError) -> AnthropicEvent {
    AnthropicEvent {
        name: "error",
        data: json!({
            "type": "error",
            "error": {
                "type": err.error_type(Wire::Anthropic),
                "message": err.to_string()
            }
        }),
    }
}

/// Token counting is not meaningful for a synthetic backend; report the
/// fixed minimum so clients that require the endpoint keep working.
async fn count_tokens(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({"input_tokens": 1}))
}

// ---------------------------------------------------------------------------
// Catalog and liveness
// ---------------------------------------------------------------------------

async fn models(State(state): State<AppState>) -> Json<ModelCatalog> {
    Json(state.catalog.as_ref().clone())
}

async fn root() -> &'static str {
    "Server running"
}
