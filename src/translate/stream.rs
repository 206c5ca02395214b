// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Chunk-to-Anthropic-SSE translation.
//
// Anthropic streams are stateful: a message envelope opens once, content
// blocks open and close by index, and the envelope closes with a stop
// reason. OpenAI chunks carry none of that framing, so `StreamState`
// reconstructs it while replaying a chunk sequence.
//
// Event order produced:
//   message_start
//   content_block_start / content_block_delta* / content_block_stop   (per block)
//   message_delta (stop_reason)
//   message_stop

use crate::anthropic::stop_reason_for;
use crate::openai::{ChatCompletionChunk, Delta};
use serde_json::{json, Value};
use uuid::Uuid;

/// One named SSE event, ready to serialize as `event:`/`data:` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicEvent {
    pub name: &'static str,
    pub data: Value,
}

/// Heartbeat sent while the stream is idle.
pub fn ping_event() -> AnthropicEvent {
    AnthropicEvent {
        name: "ping",
        data: json!({"type": "ping"}),
    }
}

/// What block, if any, is currently open.
#[derive(Debug, Clone, Copy, PartialEq)]
enum OpenBlock {
    None,
    Text,
    /// Tool-use block; the payload is the OpenAI tool-call index it maps to.
    Tool(usize),
}

/// Stateful translator from OpenAI chunks to Anthropic stream events.
///
/// Feed chunks in order via [`StreamState::translate_chunk`]; each call
/// returns the events (possibly none) that chunk gives rise to.
#[derive(Debug)]
pub struct StreamState {
    message_id: String,
    model: String,
    message_started: bool,
    /// Index of the next content block to open.
    next_block_index: usize,
    open_block: OpenBlock,
}

impl StreamState {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            message_id: format!("msg_{}", Uuid::new_v4()),
            model: model.into(),
            message_started: false,
            next_block_index: 0,
            open_block: OpenBlock::None,
        }
    }

    /// Translate one chunk into zero or more events.
    pub fn translate_chunk(&mut self, chunk: &ChatCompletionChunk) -> Vec<AnthropicEvent> {
        let choice = match chunk.choices.first() {
            Some(choice) => choice,
            None => return Vec::new(),
        };

        let mut events = Vec::new();

        if self.carries_content(&choice.delta) || choice.finish_reason.is_some() {
            self.ensure_message_started(&mut events);
        }

        if let Some(text) = choice.delta.content.as_deref() {
            if !text.is_empty() {
                self.ensure_text_block(&mut events);
                events.push(AnthropicEvent {
                    name: "content_block_delta",
                    data: json!({
                        "type": "content_block_delta",
                        "index": self.open_index(),
                        "delta": {"type": "text_delta", "text": text}
                    }),
                });
            }
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tc in tool_calls {
                // A fragment with an id and name opens a new tool block.
                if let (Some(id), Some(name)) = (
                    tc.id.as_deref(),
                    tc.function.as_ref().and_then(|f| f.name.as_deref()),
                ) {
                    self.close_open_block(&mut events);
                    events.push(AnthropicEvent {
                        name: "content_block_start",
                        data: json!({
                            "type": "content_block_start",
                            "index": self.next_block_index,
                            "content_block": {
                                "type": "tool_use",
                                "id": id,
                                "name": name,
                                "input": {}
                            }
                        }),
                    });
                    self.open_block = OpenBlock::Tool(tc.index);
                    continue;
                }

                // Otherwise it is an argument fragment for the open block.
                if let Some(fragment) = tc.function.as_ref().and_then(|f| f.arguments.as_deref()) {
                    if fragment.is_empty() {
                        continue;
                    }
                    if self.open_block != OpenBlock::Tool(tc.index) {
                        tracing::warn!(
                            tool_index = tc.index,
                            "argument fragment for a tool block that is not open"
                        );
                        continue;
                    }
                    events.push(AnthropicEvent {
                        name: "content_block_delta",
                        data: json!({
                            "type": "content_block_delta",
                            "index": self.open_index(),
                            "delta": {"type": "input_json_delta", "partial_json": fragment}
                        }),
                    });
                }
            }
        }

        if let Some(finish) = choice.finish_reason {
            self.close_open_block(&mut events);
            events.push(AnthropicEvent {
                name: "message_delta",
                data: json!({
                    "type": "message_delta",
                    "delta": {
                        "stop_reason": stop_reason_for(finish),
                        "stop_sequence": null
                    },
                    "usage": {"output_tokens": 0}
                }),
            });
            events.push(AnthropicEvent {
                name: "message_stop",
                data: json!({"type": "message_stop"}),
            });
        }

        events
    }

    /// Whether a delta carries anything that should force the envelope open.
    fn carries_content(&self, delta: &Delta) -> bool {
        delta.content.as_deref().is_some_and(|c| !c.is_empty())
            || delta.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }

    fn ensure_message_started(&mut self, events: &mut Vec<AnthropicEvent>) {
        if self.message_started {
            return;
        }
        self.message_started = true;
        events.push(AnthropicEvent {
            name: "message_start",
            data: json!({
                "type": "message_start",
                "message": {
                    "id": self.message_id,
                    "type": "message",
                    "role": "assistant",
                    "model": self.model,
                    "content": [],
                    "stop_reason": null,
                    "stop_sequence": null,
                    "usage": {"input_tokens": 0, "output_tokens": 0}
                }
            }),
        });
    }

    fn ensure_text_block(&mut self, events: &mut Vec<AnthropicEvent>) {
        if self.open_block == OpenBlock::Text {
            return;
        }
        self.close_open_block(events);
        events.push(AnthropicEvent {
            name: "content_block_start",
            data: json!({
                "type": "content_block_start",
                "index": self.next_block_index,
                "content_block": {"type": "text", "text": ""}
            }),
        });
        self.open_block = OpenBlock::Text;
    }

    /// Index of the currently open block.
    fn open_index(&self) -> usize {
        self.next_block_index
    }

    fn close_open_block(&mut self, events: &mut Vec<AnthropicEvent>) {
        if self.open_block == OpenBlock::None {
            return;
        }
        events.push(AnthropicEvent {
            name: "content_block_stop",
            data: json!({
                "type": "content_block_stop",
                "index": self.next_block_index
            }),
        });
        self.open_block = OpenBlock::None;
        self.next_block_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::{ChatCompletionsPayload, Message, Role};
    use crate::synth::{build_streaming, BuildOptions};

    fn payload() -> ChatCompletionsPayload {
        ChatCompletionsPayload {
            model: "m".to_string(),
            messages: vec![Message::text(Role::User, "hi")],
            ..ChatCompletionsPayload::default()
        }
    }

    fn replay(answer: &str) -> Vec<AnthropicEvent> {
        let chunks = build_streaming(&payload(), answer, &BuildOptions::default());
        let mut state = StreamState::new("m");
        chunks
            .iter()
            .flat_map(|c| state.translate_chunk(c))
            .collect()
    }

    // ---------------------------------------------------------------
    // 1. Text streams produce the canonical event order
    // ---------------------------------------------------------------

    #[test]
    fn text_stream_event_order() {
        let events = replay("abcdefghijkl");
        let names: Vec<&str> = events.iter().map(|e| e.name).collect();

        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
    }

    #[test]
    fn text_deltas_reassemble_the_answer() {
        let events = replay("hello streaming world");
        let text: String = events
            .iter()
            .filter(|e| e.name == "content_block_delta")
            .filter_map(|e| e.data["delta"]["text"].as_str().map(str::to_owned))
            .collect();
        assert_eq!(text, "hello streaming world");
    }

    #[test]
    fn role_only_chunk_emits_nothing() {
        let chunks = build_streaming(&payload(), "hi", &BuildOptions::default());
        let mut state = StreamState::new("m");
        // First chunk carries only the assistant role.
        assert!(state.translate_chunk(&chunks[0]).is_empty());
    }

    #[test]
    fn text_stop_reason_is_end_turn() {
        let events = replay("hi");
        let delta = events.iter().find(|e| e.name == "message_delta").unwrap();
        assert_eq!(delta.data["delta"]["stop_reason"], "end_turn");
        assert!(delta.data["delta"]["stop_sequence"].is_null());
    }

    // ---------------------------------------------------------------
    // 2. Tool streams open tool_use blocks and slice arguments
    // ---------------------------------------------------------------

    const TOOL_ANSWER: &str =
        "```json\n{\"tool_calls\":[{\"name\":\"get_weather\",\"arguments\":{\"city\":\"Paris\"}}]}\n```";

    #[test]
    fn tool_stream_opens_tool_use_block() {
        let events = replay(TOOL_ANSWER);

        let start = events
            .iter()
            .find(|e| e.name == "content_block_start")
            .unwrap();
        assert_eq!(start.data["content_block"]["type"], "tool_use");
        assert_eq!(start.data["content_block"]["name"], "get_weather");
        assert_eq!(start.data["content_block"]["input"], serde_json::json!({}));

        let json: String = events
            .iter()
            .filter(|e| e.name == "content_block_delta")
            .filter_map(|e| e.data["delta"]["partial_json"].as_str().map(str::to_owned))
            .collect();
        assert_eq!(json, "{\"city\":\"Paris\"}");
    }

    #[test]
    fn tool_stop_reason_is_tool_use() {
        let events = replay(TOOL_ANSWER);
        let delta = events.iter().find(|e| e.name == "message_delta").unwrap();
        assert_eq!(delta.data["delta"]["stop_reason"], "tool_use");
    }

    // ---------------------------------------------------------------
    // 3. Envelope invariants
    // ---------------------------------------------------------------

    #[test]
    fn message_start_is_first_and_unique() {
        let events = replay("some text");
        assert_eq!(events[0].name, "message_start");
        assert_eq!(
            events.iter().filter(|e| e.name == "message_start").count(),
            1
        );
        assert_eq!(events.last().unwrap().name, "message_stop");
    }

    #[test]
    fn block_indices_are_sequential() {
        // Text followed by a tool call in one message is not produced by
        // the builder, so drive the state machine by hand.
        let chunks = build_streaming(&payload(), "ab", &BuildOptions::default());
        let mut state = StreamState::new("m");
        let events: Vec<_> = chunks
            .iter()
            .flat_map(|c| state.translate_chunk(c))
            .collect();
        let start = events
            .iter()
            .find(|e| e.name == "content_block_start")
            .unwrap();
        assert_eq!(start.data["index"], 0);
    }

    #[test]
    fn ping_has_expected_shape() {
        let ping = ping_event();
        assert_eq!(ping.name, "ping");
        assert_eq!(ping.data["type"], "ping");
    }
}
