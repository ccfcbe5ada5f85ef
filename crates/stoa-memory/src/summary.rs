// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text of the long-term entry recorded for one exchange.

const ELLIPSIS: char = '\u{2026}';

/// Summarizes a user/persona exchange, truncated to `max_chars` chars.
pub fn summarize_exchange(
    persona_name: &str,
    user_message: &str,
    reply: &str,
    max_chars: usize,
) -> String {
    let full = format!(
        "User asked: {}\n{persona_name} answered: {}",
        user_message.trim(),
        reply.trim()
    );
    truncate_chars(&full, max_chars)
}

/// Truncates on a char boundary, replacing the tail with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    out
}
