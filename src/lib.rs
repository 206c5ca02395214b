// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Onelane bridges OpenAI chat completions and Anthropic Messages clients
// onto a single-flight, non-streaming backend. Requests pass an admission
// gate, may short-circuit through the canned-response cache, and are
// otherwise serialized through a FIFO queue whose worker owns the
// backend. Streaming is synthesized by slicing finished answers.

pub mod anthropic;
pub mod cache;
pub mod catalog;
pub mod completer;
pub mod config;
pub mod gate;
pub mod openai;
pub mod passthrough;
pub mod prompt;
pub mod queue;
pub mod server;
pub mod synth;
pub mod translate;
