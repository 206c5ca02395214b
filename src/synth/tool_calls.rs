// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Tool-call extraction from a finished answer.
//
// The backend cannot emit structured tool calls; it is instructed (see
// `prompt`) to embed them as a JSON object, either as the whole answer
// (JSON mode) or inside the first ```json fenced block. Parse failure or
// absence is not an error; it simply means "no tool calls".

use crate::openai::{FunctionCall, ToolCall};
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// Matches the first ```json fenced block, non-greedy, across lines.
fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json(.*?)```").expect("static regex"))
}

#[derive(serde::Deserialize)]
struct ToolCallEnvelope {
    tool_calls: Option<Vec<ToolCallEntry>>,
}

#[derive(serde::Deserialize)]
struct ToolCallEntry {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Locate and parse a `{"tool_calls": [...]}` payload inside `answer`.
///
/// In JSON mode the entire answer is the candidate; otherwise the inner
/// text of the first ```json fenced block is. Each parsed entry gets a
/// fresh `call_<uuid>` id and its arguments re-serialized to the JSON
/// string the OpenAI wire format carries.
///
/// Returns `None` when there is no candidate, the candidate does not
/// parse, or it has no `tool_calls` array.
pub fn extract_tool_calls(answer: &str, json_mode: bool) -> Option<Vec<ToolCall>> {
    let candidate: &str = if json_mode {
        answer
    } else {
        fenced_json_re()
            .captures(answer)?
            .get(1)
            .map(|m| m.as_str())?
    };

    let envelope: ToolCallEnvelope = match serde_json::from_str(candidate.trim()) {
        Ok(e) => e,
        Err(err) => {
            tracing::debug!(error = %err, "tool call candidate did not parse");
            return None;
        }
    };

    let entries = envelope.tool_calls?;
    let calls = entries
        .into_iter()
        .map(|entry| ToolCall {
            id: format!("call_{}", Uuid::new_v4()),
            kind: "function".to_string(),
            function: FunctionCall {
                name: entry.name,
                arguments: entry.arguments.to_string(),
            },
        })
        .collect();
    Some(calls)
}
