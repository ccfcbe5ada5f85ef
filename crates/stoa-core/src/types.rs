// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types used across the Stoa workspace.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Conversation id used when the caller does not partition conversations.
pub const DEFAULT_CONVERSATION: &str = "default";

/// Health status reported by an adapter's health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    MemoryBackend,
}

// --- Persona types ---

/// An immutable persona definition, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDescriptor {
    pub id: String,
    pub name: String,
    pub perspective: String,
    pub style: String,
}

impl PersonaDescriptor {
    /// Size of the persona's mandatory context fields, in chars.
    pub fn size(&self) -> usize {
        char_len(&self.name) + char_len(&self.perspective) + char_len(&self.style)
    }
}

// --- Conversation types ---

/// Author of a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Content size in chars.
    pub fn size(&self) -> usize {
        char_len(&self.content)
    }
}

/// Key of a short-term session: one persona, one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub persona_id: String,
    pub conversation_id: String,
}

impl SessionKey {
    pub fn new(persona_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            persona_id: persona_id.into(),
            conversation_id: conversation_id.into(),
        }
    }

    /// Key of the persona's default conversation.
    pub fn persona(persona_id: impl Into<String>) -> Self {
        Self::new(persona_id, DEFAULT_CONVERSATION)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.persona_id, self.conversation_id)
    }
}

/// Ordered short-term dialogue for one session key.
///
/// `epoch` increases every time the session is cleared. Writers that read the
/// session before a clear carry the old epoch and are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: SessionKey,
    pub turns: Vec<Turn>,
    pub epoch: u64,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            turns: Vec::new(),
            epoch: 0,
        }
    }
}

// --- Long-term memory types ---

/// A persisted long-term memory entry. Belongs to exactly one persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub persona_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A memory entry before the store assigns id, embedding and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemoryEntry {
    pub persona_id: String,
    pub content: String,
}

/// Entries returned by a memory query, in descending score order.
///
/// `entries` and `scores` are parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub entries: Vec<MemoryEntry>,
    pub scores: Vec<f32>,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a context from already ranked `(entry, score)` pairs.
    pub fn from_ranked(ranked: Vec<(MemoryEntry, f32)>) -> Self {
        let (entries, scores) = ranked.into_iter().unzip();
        Self { entries, scores }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemoryEntry, f32)> {
        self.entries.iter().zip(self.scores.iter().copied())
    }

    /// Keeps only entries scoring at least `min_score`.
    pub fn retain_min_score(&mut self, min_score: f32) {
        let keep: Vec<bool> = self.scores.iter().map(|s| *s >= min_score).collect();
        let mut keep = keep.into_iter();
        self.entries.retain(|_| keep.next().unwrap_or(false));
        self.scores.retain(|s| *s >= min_score);
    }

    /// Drops the lowest-relevance entry, the last one.
    pub fn pop_least_relevant(&mut self) -> Option<(MemoryEntry, f32)> {
        let entry = self.entries.pop()?;
        let score = self.scores.pop().unwrap_or_default();
        Some((entry, score))
    }
}

/// Per-request context handed to the generation collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub persona: PersonaDescriptor,
    pub retrieved_summary: String,
    /// Recent turns in conversational order. The last one is the newest user message.
    pub recent_turns: Vec<Turn>,
}

impl AssembledContext {
    /// Total size in chars: persona fields, summary and turn contents.
    pub fn size(&self) -> usize {
        self.persona.size()
            + char_len(&self.retrieved_summary)
            + self.recent_turns.iter().map(Turn::size).sum::<usize>()
    }

    /// The newest user message, if present.
    pub fn newest_user_message(&self) -> Option<&Turn> {
        self.recent_turns.last().filter(|t| t.role == Role::User)
    }
}

/// Which memory a reset clears.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    ShortTerm,
    LongTerm,
    Both,
}

impl ResetScope {
    pub fn includes_short_term(self) -> bool {
        matches!(self, Self::ShortTerm | Self::Both)
    }

    pub fn includes_long_term(self) -> bool {
        matches!(self, Self::LongTerm | Self::Both)
    }
}

// --- Embedding types ---

/// Input to an embedding adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Length of `s` in chars, the unit of every context size.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn entry(id: &str) -> MemoryEntry {
        MemoryEntry {
            id: id.into(),
            persona_id: "socrates".into(),
            content: format!("content {id}"),
            embedding: vec![1.0, 0.0],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reset_scope_string_forms() {
        for (scope, s) in [
            (ResetScope::ShortTerm, "short_term"),
            (ResetScope::LongTerm, "long_term"),
            (ResetScope::Both, "both"),
        ] {
            assert_eq!(scope.to_string(), s);
            assert_eq!(ResetScope::from_str(s).unwrap(), scope);
        }
        assert!(ResetScope::from_str("everything").is_err());
    }

    #[test]
    fn reset_scope_parts() {
        assert!(ResetScope::Both.includes_short_term());
        assert!(ResetScope::Both.includes_long_term());
        assert!(!ResetScope::ShortTerm.includes_long_term());
        assert!(!ResetScope::LongTerm.includes_short_term());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
    }

    #[test]
    fn default_session_key() {
        let key = SessionKey::persona("plato");
        assert_eq!(key.conversation_id, DEFAULT_CONVERSATION);
        assert_eq!(key.to_string(), "plato/default");
    }

    #[test]
    fn sizes_count_chars_not_bytes() {
        let turn = Turn::user("Ren\u{e9}");
        assert_eq!(turn.size(), 4);
        let persona = PersonaDescriptor {
            id: "descartes".into(),
            name: "Ren\u{e9}".into(),
            perspective: "ab".into(),
            style: "c".into(),
        };
        assert_eq!(persona.size(), 7);
    }

    #[test]
    fn retain_min_score_keeps_entries_and_scores_aligned() {
        let mut ctx = RetrievedContext::from_ranked(vec![
            (entry("a"), 0.9),
            (entry("b"), 0.5),
            (entry("c"), 0.1),
        ]);
        ctx.retain_min_score(0.5);
        assert_eq!(ctx.len(), 2);
        let ids: Vec<_> = ctx.iter().map(|(e, _)| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(ctx.scores, vec![0.9, 0.5]);
    }

    #[test]
    fn pop_least_relevant_takes_the_tail() {
        let mut ctx = RetrievedContext::from_ranked(vec![(entry("a"), 0.9), (entry("b"), 0.2)]);
        let (popped, score) = ctx.pop_least_relevant().unwrap();
        assert_eq!(popped.id, "b");
        assert_eq!(score, 0.2);
        assert_eq!(ctx.len(), 1);
        ctx.pop_least_relevant();
        assert!(ctx.pop_least_relevant().is_none());
    }

    #[test]
    fn newest_user_message_requires_user_role() {
        let persona = PersonaDescriptor {
            id: "turing".into(),
            name: "Alan Turing".into(),
            perspective: String::new(),
            style: String::new(),
        };
        let mut ctx = AssembledContext {
            persona,
            retrieved_summary: String::new(),
            recent_turns: vec![Turn::assistant("hello"), Turn::user("can machines think?")],
        };
        assert_eq!(
            ctx.newest_user_message().map(|t| t.content.as_str()),
            Some("can machines think?")
        );
        ctx.recent_turns.push(Turn::assistant("perhaps"));
        assert!(ctx.newest_user_message().is_none());
    }
}
