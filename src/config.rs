// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Runtime configuration, resolved once at startup from CLI flags and
// environment, then shared read-only.

use crate::synth::DEFAULT_CHUNK_SIZE;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 4157;
pub const DEFAULT_PROXY_UPSTREAM: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Port to bind on localhost.
    pub port: u16,
    /// Treat backend answers as JSON envelopes.
    pub json_mode: bool,
    /// Require operator approval per request.
    pub manual_approve: bool,
    /// Minimum spacing between admitted requests, if any.
    pub rate_limit: Option<Duration>,
    /// Hold rate-limited requests instead of rejecting them.
    pub rate_limit_wait: bool,
    /// Characters per synthetic stream chunk.
    pub chunk_size: usize,
    /// Bearer key for the pass-through upstream.
    pub proxy_api_key: Option<String>,
    /// OpenAI-compatible pass-through endpoint.
    pub proxy_upstream: String,
    /// Optional model catalog file.
    pub models_file: Option<PathBuf>,
    /// Backend command and its arguments.
    pub backend_cmd: String,
    pub backend_args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            json_mode: false,
            manual_approve: false,
            rate_limit: None,
            rate_limit_wait: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            proxy_api_key: None,
            proxy_upstream: DEFAULT_PROXY_UPSTREAM.to_string(),
            models_file: None,
            backend_cmd: "cat".to_string(),
            backend_args: Vec::new(),
        }
    }
}
