// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Fixed-size chunking of a finished answer for synthetic streaming.

/// Slice `text` into runs of `size` characters, in order.
///
/// Produces `ceil(len / size)` chunks whose concatenation equals the input
/// exactly; the empty string yields no chunks. Boundaries fall on Unicode
/// scalar values, never inside a code point. A size of zero is treated as
/// one so no caller can silently drop the whole answer.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    if text.is_empty() {
        return chunks;
    }

    let mut current = String::new();
    let mut len = 0;
    for ch in text.chars() {
        current.push(ch);
        len += 1;
        if len == size {
            chunks.push(std::mem::take(&mut current));
            len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
