// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// OpenAI <-> Anthropic protocol translation.
//
// Responsibilities:
// - Lower an inbound Anthropic Messages request into the internal OpenAI
//   chat completions payload everything downstream speaks.
// - Lift a finished chat completion back into a Messages response.
// - (stream submodule) replay a chunk sequence as Anthropic SSE events.
//
// Inbound payloads arrive as `serde_json::Value` so unknown block types
// degrade to "skipped" rather than failing the whole request.

mod stream;

pub use stream::{ping_event, AnthropicEvent, StreamState};

use crate::anthropic::{stop_reason_for, ContentBlock, MessagesResponse, MessagesUsage};
use crate::openai::{
    ChatCompletionResponse, ChatCompletionsPayload, FunctionCall, FunctionDescription, Message,
    MessageContent, Role, Tool, ToolCall,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` has the wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Anthropic request -> OpenAI payload
// ---------------------------------------------------------------------------

/// Lower an Anthropic Messages request into the internal OpenAI payload.
///
/// `system` (string or text-block array) becomes a leading system message.
/// Within each Anthropic message, text blocks concatenate, `tool_use`
/// blocks become assistant `tool_calls`, and `tool_result` blocks become
/// separate tool-role messages. Unknown block types are skipped.
pub fn openai_payload_from_anthropic(
    body: &Value,
) -> Result<ChatCompletionsPayload, TranslateError> {
    let obj = body.as_object().ok_or(TranslateError::NotAnObject)?;

    let model = obj
        .get("model")
        .ok_or(TranslateError::MissingField("model"))?
        .as_str()
        .ok_or(TranslateError::WrongType {
            field: "model",
            expected: "string",
        })?
        .to_owned();

    let mut messages = Vec::new();
    if let Some(system) = obj.get("system") {
        if let Some(text) = system_text(system) {
            messages.push(Message::text(Role::System, text));
        }
    }

    let inbound = obj
        .get("messages")
        .ok_or(TranslateError::MissingField("messages"))?
        .as_array()
        .ok_or(TranslateError::WrongType {
            field: "messages",
            expected: "array",
        })?;

    for message in inbound {
        lower_message(message, &mut messages)?;
    }

    let tools = obj.get("tools").and_then(Value::as_array).map(|tools| {
        tools
            .iter()
            .filter_map(|tool| {
                Some(Tool {
                    kind: "function".to_string(),
                    function: FunctionDescription {
                        name: tool.get("name")?.as_str()?.to_owned(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                        parameters: tool.get("input_schema").cloned(),
                    },
                })
            })
            .collect::<Vec<_>>()
    });

    Ok(ChatCompletionsPayload {
        model,
        messages,
        max_tokens: obj
            .get("max_tokens")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        temperature: obj.get("temperature").and_then(Value::as_f64),
        top_p: obj.get("top_p").and_then(Value::as_f64),
        stream: obj.get("stream").and_then(Value::as_bool).unwrap_or(false),
        tools: tools.filter(|t| !t.is_empty()),
        tool_choice: None,
        response_format: None,
        stop: None,
        user: None,
    })
}

/// Flatten the `system` field, which may be a plain string or an array of
/// text blocks.
fn system_text(system: &Value) -> Option<String> {
    match system {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        _ => None,
    }
}

/// Lower one Anthropic message, appending the OpenAI messages it expands to.
fn lower_message(message: &Value, out: &mut Vec<Message>) -> Result<(), TranslateError> {
    let role = match message.get("role").and_then(Value::as_str) {
        Some("assistant") => Role::Assistant,
        _ => Role::User,
    };

    let content = match message.get("content") {
        Some(content) => content,
        None => return Ok(()),
    };

    // String content is the common case and maps one to one.
    if let Some(text) = content.as_str() {
        out.push(Message::text(role, text));
        return Ok(());
    }

    let blocks = match content.as_array() {
        Some(blocks) => blocks,
        None => {
            return Err(TranslateError::WrongType {
                field: "content",
                expected: "string or array",
            })
        }
    };

    let mut texts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut tool_results: Vec<Message> = Vec::new();

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    texts.push(text);
                }
            }
            Some("tool_use") => {
                tool_calls.push(ToolCall {
                    id: block
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                    kind: "function".to_string(),
                    function: FunctionCall {
                        name: block
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned(),
                        arguments: block
                            .get("input")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Default::default()))
                            .to_string(),
                    },
                });
            }
            Some("tool_result") => {
                tool_results.push(Message {
                    role: Role::Tool,
                    content: Some(MessageContent::Text(tool_result_text(block))),
                    name: None,
                    tool_calls: None,
                    tool_call_id: block
                        .get("tool_use_id")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                });
            }
            _ => {
                // `tracing` macros pull their own `Value` trait into scope,
                // so the serde variant must stay fully qualified here.
                tracing::debug!(
                    block_type = block.get("type").and_then(serde_json::Value::as_str),
                    "skipping unrecognized content block"
                );
            }
        }
    }

    if !texts.is_empty() || !tool_calls.is_empty() {
        out.push(Message {
            role,
            content: if texts.is_empty() {
                None
            } else {
                Some(MessageContent::Text(texts.join("\n")))
            },
            name: None,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        });
    }
    out.extend(tool_results);
    Ok(())
}

/// Flatten a `tool_result` block's content to plain text.
fn tool_result_text(block: &Value) -> String {
    match block.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// OpenAI response -> Anthropic response
// ---------------------------------------------------------------------------

/// Lift a finished chat completion into a Messages response.
pub fn messages_response_from(resp: &ChatCompletionResponse) -> MessagesResponse {
    let mut content = Vec::new();
    let mut stop_reason = None;

    if let Some(choice) = resp.choices.first() {
        if let Some(text) = choice.message.content.as_deref() {
            if !text.is_empty() {
                content.push(ContentBlock::Text {
                    text: text.to_owned(),
                });
            }
        }
        if let Some(calls) = &choice.message.tool_calls {
            for call in calls {
                content.push(ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    // Arguments arrive as a JSON string; fall back to an
                    // empty object when they do not parse.
                    input: serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| Value::Object(Default::default())),
                });
            }
        }
        stop_reason = Some(stop_reason_for(choice.finish_reason));
    }

    MessagesResponse {
        id: format!("msg_{}", Uuid::new_v4()),
        kind: "message".to_string(),
        role: "assistant".to_string(),
        model: resp.model.clone(),
        content,
        stop_reason,
        stop_sequence: None,
        usage: MessagesUsage {
            input_tokens: 0,
            output_tokens: 0,
        },
    }
}
