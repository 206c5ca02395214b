// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Anthropic Messages API wire types (response side).
//
// Inbound Anthropic payloads are open-ended (unknown block types must not
// fail the request), so they are parsed from `serde_json::Value` in
// `translate`. The shapes we produce, the non-streaming Messages
// response and the stop-reason vocabulary, are typed here.

use crate::openai::FinishReason;
use serde::{Deserialize, Serialize};

/// Anthropic stop-reason vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
}

/// Map an OpenAI finish reason onto the Anthropic vocabulary.
///
/// `content_filter` has no Anthropic equivalent and maps to `end_turn`.
pub fn stop_reason_for(finish: FinishReason) -> StopReason {
    match finish {
        FinishReason::Stop | FinishReason::ContentFilter => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ToolCalls => StopReason::ToolUse,
    }
}

/// A content block in a Messages response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Non-streaming Messages API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: MessagesUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // 1. Stop-reason mapping is category-preserving
    // ---------------------------------------------------------------

    #[test]
    fn stop_maps_to_end_turn() {
        assert_eq!(stop_reason_for(FinishReason::Stop), StopReason::EndTurn);
    }

    #[test]
    fn tool_calls_maps_to_tool_use() {
        assert_eq!(stop_reason_for(FinishReason::ToolCalls), StopReason::ToolUse);
    }

    #[test]
    fn length_maps_to_max_tokens() {
        assert_eq!(stop_reason_for(FinishReason::Length), StopReason::MaxTokens);
    }

    #[test]
    fn content_filter_falls_back_to_end_turn() {
        assert_eq!(
            stop_reason_for(FinishReason::ContentFilter),
            StopReason::EndTurn
        );
    }

    // ---------------------------------------------------------------
    // 2. Wire shapes
    // ---------------------------------------------------------------

    #[test]
    fn content_block_serializes_with_type_tag() {
        let block = ContentBlock::ToolUse {
            id: "toolu_1".into(),
            name: "get_weather".into(),
            input: serde_json::json!({"city": "Paris"}),
        };
        let val = serde_json::to_value(&block).unwrap();
        assert_eq!(val["type"], "tool_use");
        assert_eq!(val["name"], "get_weather");
        assert_eq!(val["input"]["city"], "Paris");
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::EndTurn).unwrap(),
            "\"end_turn\""
        );
        assert_eq!(
            serde_json::to_string(&StopReason::ToolUse).unwrap(),
            "\"tool_use\""
        );
    }
}
