// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Response synthesis.
//
// Responsibilities:
// - Shape a finished backend answer into a full OpenAI chat completion
//   response, or into the chunk sequence a streaming client expects.
// - Route through the tool-call extractor first: an answer carrying tool
//   calls produces no text content.
// - Unwrap JSON-mode answers down to their "content" field.

use crate::openai::{
    ChatCompletionChunk, ChatCompletionResponse, ChatCompletionsPayload, ChunkChoice, Delta,
    FinishReason, FunctionCallDelta, ResponseChoice, ResponseMessage, Role, ToolCallDelta, Usage,
};
use crate::synth::chunker::chunk_text;
use crate::synth::tool_calls::extract_tool_calls;
use uuid::Uuid;

/// Characters per synthetic stream chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Fingerprint stamped on every synthesized response.
const SYSTEM_FINGERPRINT: &str = "fp_mock_fingerprint";

/// Knobs shared by both builders.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Treat the whole answer as a JSON envelope (`{"content": ..., "tool_calls": ...}`).
    pub json_mode: bool,
    /// Characters per streamed chunk.
    pub chunk_size: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            json_mode: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Pull the `content` string out of a JSON-mode answer, if it is one.
pub fn unwrap_json_content(answer: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(answer.trim()).ok()?;
    value
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_owned)
}

fn completion_id() -> String {
    Uuid::new_v4().to_string()
}

/// Text the client should see for `answer`. In JSON mode a missing or
/// unparseable `content` field yields `None`, never the raw envelope.
fn visible_content(answer: &str, json_mode: bool) -> Option<String> {
    if json_mode {
        unwrap_json_content(answer)
    } else {
        Some(answer.to_owned())
    }
}

/// Build a complete (non-streaming) chat completion from a backend answer.
pub fn build_non_streaming(
    payload: &ChatCompletionsPayload,
    answer: &str,
    opts: &BuildOptions,
) -> ChatCompletionResponse {
    let (message, finish_reason) = match extract_tool_calls(answer, opts.json_mode) {
        Some(calls) => (
            ResponseMessage {
                role: Role::Assistant,
                content: None,
                tool_calls: Some(calls),
            },
            FinishReason::ToolCalls,
        ),
        None => (
            ResponseMessage {
                role: Role::Assistant,
                content: visible_content(answer, opts.json_mode),
                tool_calls: None,
            },
            FinishReason::Stop,
        ),
    };

    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: payload.model.clone(),
        choices: vec![ResponseChoice {
            index: 0,
            message,
            logprobs: None,
            finish_reason,
        }],
        system_fingerprint: Some(SYSTEM_FINGERPRINT.to_string()),
        usage: Some(Usage::default()),
    }
}

/// Build the full chunk sequence a streaming client will receive.
///
/// Every chunk shares one id, timestamp, and model. The sequence is:
/// a role-opening chunk, then either per-slice text deltas or per-call
/// tool deltas (name first, then sliced arguments), then a terminal
/// chunk carrying only the finish reason.
pub fn build_streaming(
    payload: &ChatCompletionsPayload,
    answer: &str,
    opts: &BuildOptions,
) -> Vec<ChatCompletionChunk> {
    let id = completion_id();
    let created = chrono::Utc::now().timestamp();
    let model = payload.model.clone();

    let chunk = |delta: Delta, finish_reason: Option<FinishReason>| ChatCompletionChunk {
        id: id.clone(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: model.clone(),
        system_fingerprint: Some(SYSTEM_FINGERPRINT.to_string()),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            logprobs: None,
            finish_reason,
        }],
    };

    let mut chunks = vec![chunk(
        Delta {
            role: Some(Role::Assistant),
            ..Delta::default()
        },
        None,
    )];

    let finish = match extract_tool_calls(answer, opts.json_mode) {
        Some(calls) => {
            for (index, call) in calls.into_iter().enumerate() {
                let arguments = call.function.arguments;
                chunks.push(chunk(
                    Delta {
                        tool_calls: Some(vec![ToolCallDelta {
                            index,
                            id: Some(call.id),
                            kind: Some(call.kind),
                            function: Some(FunctionCallDelta {
                                name: Some(call.function.name),
                                arguments: Some(String::new()),
                            }),
                        }]),
                        ..Delta::default()
                    },
                    None,
                ));
                for slice in chunk_text(&arguments, opts.chunk_size) {
                    chunks.push(chunk(
                        Delta {
                            tool_calls: Some(vec![ToolCallDelta {
                                index,
                                id: None,
                                kind: None,
                                function: Some(FunctionCallDelta {
                                    name: None,
                                    arguments: Some(slice),
                                }),
                            }]),
                            ..Delta::default()
                        },
                        None,
                    ));
                }
            }
            FinishReason::ToolCalls
        }
        None => {
            let content = visible_content(answer, opts.json_mode).unwrap_or_default();
            for slice in chunk_text(&content, opts.chunk_size) {
                chunks.push(chunk(
                    Delta {
                        content: Some(slice),
                        ..Delta::default()
                    },
                    None,
                ));
            }
            FinishReason::Stop
        }
    };

    chunks.push(chunk(Delta::default(), Some(finish)));
    chunks
}
