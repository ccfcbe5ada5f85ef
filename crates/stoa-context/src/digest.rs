// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of retrieved memory entries into a prompt section.

use stoa_core::types::RetrievedContext;

/// Heading of the rendered memory section.
pub const DIGEST_HEADING: &str = "## Relevant Memories\n";

/// Renders retrieved entries in relevance order, one bullet each.
///
/// Returns an empty string when nothing was retrieved.
pub fn render_digest(retrieved: &RetrievedContext) -> String {
    if retrieved.is_empty() {
        return String::new();
    }
    let mut out = String::from(DIGEST_HEADING);
    for entry in &retrieved.entries {
        out.push_str("- ");
        out.push_str(&entry.content.replace('\n', " "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stoa_core::types::MemoryEntry;

    fn entry(content: &str) -> MemoryEntry {
        MemoryEntry {
            id: content.into(),
            persona_id: "socrates".into(),
            content: content.into(),
            embedding: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_retrieval_renders_nothing() {
        assert_eq!(render_digest(&RetrievedContext::empty()), "");
    }

    #[test]
    fn entries_render_as_bullets_in_order() {
        let ctx = RetrievedContext::from_ranked(vec![
            (entry("User asked: What is virtue?\nSocrates answered: Knowledge."), 0.9),
            (entry("We spoke of courage"), 0.4),
        ]);
        assert_eq!(
            render_digest(&ctx),
            "## Relevant Memories\n\
             - User asked: What is virtue? Socrates answered: Knowledge.\n\
             - We spoke of courage\n"
        );
    }
}
