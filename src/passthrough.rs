// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Pass-through proxy for prefixed models.
//
// Requests naming a model with the reserved prefix bypass the queue and
// the synthetic pipeline entirely: the prefix is stripped, the body goes
// to the configured OpenAI-compatible upstream with a bearer key, and
// the upstream's bytes (streaming included) are relayed back verbatim.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use thiserror::Error;

/// Model prefix that selects pass-through.
pub const PROXY_MODEL_PREFIX: &str = "proxy-";

#[derive(Debug, Error)]
pub enum PassthroughError {
    #[error("pass-through requested but no upstream api key is configured")]
    MissingCredential,
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

/// Whether a request body names a pass-through model.
pub fn is_proxied_model(body: &serde_json::Value) -> bool {
    body.get("model")
        .and_then(|m| m.as_str())
        .is_some_and(|m| m.starts_with(PROXY_MODEL_PREFIX))
}

/// Relay `body` to the upstream chat completions endpoint.
///
/// Strips the model prefix, attaches the bearer key, and streams the
/// upstream response body back without buffering it.
pub async fn forward(
    client: &reqwest::Client,
    upstream_url: &str,
    api_key: Option<&str>,
    mut body: serde_json::Value,
) -> Result<Response, PassthroughError> {
    let api_key = api_key.ok_or(PassthroughError::MissingCredential)?;

    if let Some(model) = body.get("model").and_then(|m| m.as_str()) {
        if let Some(stripped) = model.strip_prefix(PROXY_MODEL_PREFIX) {
            let stripped = stripped.to_owned();
            body["model"] = serde_json::Value::String(stripped);
        }
    }

    tracing::info!(upstream = upstream_url, "forwarding pass-through request");
    let upstream = client
        .post(upstream_url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| PassthroughError::Upstream(err.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .map_err(|err| PassthroughError::Upstream(err.to_string()))?;
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_owned();

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|err| PassthroughError::Upstream(err.to_string()))
}
