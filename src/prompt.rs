// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Prompt rendering for the command backend.
//
// Flattens a chat transcript into labelled plain text: system messages
// first, then the rest in order. When tools are declared, a trailing
// section instructs the backend to answer tool invocations as a fenced
// ```json block, which is the exact convention the tool-call extractor
// parses back out.

use crate::openai::{Message, Role, Tool};
use std::fmt::Write;

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System | Role::Developer => "SYSTEM",
        Role::User => "USER",
        Role::Assistant => "ASSISTANT",
        Role::Tool => "TOOL",
    }
}

/// Render a transcript for the backend's stdin.
pub fn render(messages: &[Message], tools: Option<&[Tool]>) -> String {
    let mut out = String::new();

    let is_system = |m: &&Message| matches!(m.role, Role::System | Role::Developer);
    for message in messages.iter().filter(is_system) {
        let _ = writeln!(out, "SYSTEM: {}", message.content_text());
    }
    for message in messages.iter().filter(|m| !is_system(&m)) {
        let _ = writeln!(
            out,
            "{}: {}",
            role_label(message.role),
            message.content_text()
        );
    }

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "\nYou may call the following tools:");
        for tool in tools {
            let _ = writeln!(
                out,
                "- {}: {}",
                tool.function.name,
                tool.function.description.as_deref().unwrap_or("")
            );
            if let Some(parameters) = &tool.function.parameters {
                let _ = writeln!(out, "  parameters: {parameters}");
            }
        }
        let _ = writeln!(
            out,
            "\nTo call tools, reply with a fenced block of the form:\n```json\n{{\"tool_calls\": [{{\"name\": \"<tool name>\", \"arguments\": {{...}}}}]}}\n```"
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::{FunctionDescription, Message};

    // ---------------------------------------------------------------
    // 1. Transcript layout
    // ---------------------------------------------------------------

    #[test]
    fn system_messages_come_first() {
        let messages = vec![
            Message::text(Role::User, "question"),
            Message::text(Role::System, "rules"),
        ];
        let rendered = render(&messages, None);

        let system_at = rendered.find("SYSTEM: rules").unwrap();
        let user_at = rendered.find("USER: question").unwrap();
        assert!(system_at < user_at);
    }

    #[test]
    fn roles_are_labelled() {
        let messages = vec![
            Message::text(Role::User, "q"),
            Message::text(Role::Assistant, "a"),
            Message::text(Role::Tool, "result"),
        ];
        let rendered = render(&messages, None);
        assert!(rendered.contains("USER: q"));
        assert!(rendered.contains("ASSISTANT: a"));
        assert!(rendered.contains("TOOL: result"));
    }

    // ---------------------------------------------------------------
    // 2. Tool instructions
    // ---------------------------------------------------------------

    #[test]
    fn tools_add_calling_instructions() {
        let tools = vec![Tool {
            kind: "function".to_string(),
            function: FunctionDescription {
                name: "get_weather".to_string(),
                description: Some("look up weather".to_string()),
                parameters: None,
            },
        }];
        let rendered = render(&[Message::text(Role::User, "hi")], Some(&tools));

        assert!(rendered.contains("- get_weather: look up weather"));
        assert!(rendered.contains("```json"));
        assert!(rendered.contains("tool_calls"));
    }

    #[test]
    fn no_tools_means_no_instructions() {
        let rendered = render(&[Message::text(Role::User, "hi")], None);
        assert!(!rendered.contains("tool_calls"));
    }
}
