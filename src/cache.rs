// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Canned-response shortcut.
//
// Some clients send high-frequency housekeeping requests (liveness
// probes, conversation-title generation) whose system prompt is a fixed
// string. Those are answered from a lookup table keyed on the exact
// system text, skipping the queue and the backend entirely. Generators
// run per hit so entries can vary their output.

use std::collections::HashMap;

/// Produces the canned answer text for one cache hit.
pub type ResponseGenerator = fn() -> String;

pub const LIVENESS_SYSTEM_PROMPT: &str = "You are a liveness probe. Reply with exactly: pong";
pub const TOPIC_TITLE_SYSTEM_PROMPT: &str =
    "Generate a short title for the conversation. Respond with JSON only.";

fn liveness_answer() -> String {
    "pong".to_string()
}

fn topic_title_answer() -> String {
    "{\"title\": \"New conversation\"}".to_string()
}

/// Exact-match table from system prompt text to canned answer generator.
pub struct ResponseCache {
    entries: HashMap<&'static str, ResponseGenerator>,
}

impl ResponseCache {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The deployment's built-in entries.
    pub fn with_defaults() -> Self {
        let mut cache = Self::empty();
        cache.insert(LIVENESS_SYSTEM_PROMPT, liveness_answer);
        cache.insert(TOPIC_TITLE_SYSTEM_PROMPT, topic_title_answer);
        cache
    }

    pub fn insert(&mut self, system_text: &'static str, generator: ResponseGenerator) {
        self.entries.insert(system_text, generator);
    }

    /// Canned answer for `system_text`, if an entry matches exactly.
    pub fn lookup(&self, system_text: &str) -> Option<String> {
        let answer = self.entries.get(system_text).map(|generate| generate());
        if answer.is_some() {
            tracing::debug!("response cache hit");
        }
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // 1. Exact matching
    // ---------------------------------------------------------------

    #[test]
    fn default_entries_answer_their_prompts() {
        let cache = ResponseCache::with_defaults();
        assert_eq!(cache.lookup(LIVENESS_SYSTEM_PROMPT).as_deref(), Some("pong"));
        assert!(cache
            .lookup(TOPIC_TITLE_SYSTEM_PROMPT)
            .unwrap()
            .contains("title"));
    }

    #[test]
    fn near_miss_is_not_a_hit() {
        let cache = ResponseCache::with_defaults();
        assert!(cache.lookup("You are a liveness probe.").is_none());
        assert!(cache
            .lookup(&format!("{LIVENESS_SYSTEM_PROMPT} "))
            .is_none());
    }

    #[test]
    fn empty_cache_never_hits() {
        assert!(ResponseCache::empty().lookup(LIVENESS_SYSTEM_PROMPT).is_none());
    }

    // ---------------------------------------------------------------
    // 2. Generators run per hit
    // ---------------------------------------------------------------

    #[test]
    fn custom_entry_uses_its_generator() {
        let mut cache = ResponseCache::empty();
        cache.insert("marker", || "generated".to_string());
        assert_eq!(cache.lookup("marker").as_deref(), Some("generated"));
    }
}
