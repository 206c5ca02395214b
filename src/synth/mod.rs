// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Synthetic response construction.
//
// The backend only ever yields one finished answer string. Everything a
// chat-completions client expects beyond that (streaming deltas, tool
// calls, finish reasons) is fabricated here:
// - Slice a finished string into fixed-size streaming deltas
// - Detect and parse an embedded tool-invocation payload
// - Assemble non-streaming responses and streaming chunk sequences
// - Unwrap JSON-mode answers into their `content` field

mod builder;
mod chunker;
mod tool_calls;

pub use builder::{
    build_non_streaming, build_streaming, unwrap_json_content, BuildOptions, DEFAULT_CHUNK_SIZE,
};
pub use chunker::chunk_text;
pub use tool_calls::extract_tool_calls;
