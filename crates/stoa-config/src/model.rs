// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Stoa.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Stoa configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoaConfig {
    /// Process-level settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Long-term memory and retrieval settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Context assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// The fixed persona roster. Replaces the built-in roster when set.
    #[serde(default = "default_personas")]
    pub personas: Vec<PersonaConfig>,
}

impl Default for StoaConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            context: ContextConfig::default(),
            anthropic: AnthropicConfig::default(),
            personas: default_personas(),
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Path to the SQLite database holding memory entries.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Maximum number of entries retrieved per response.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Entries scoring below this cosine similarity are not retrieved.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Dimension of the hashing embedder's vectors.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Maximum length of a committed exchange summary, in chars.
    #[serde(default = "default_max_entry_chars")]
    pub max_entry_chars: usize,

    /// Retrieval slower than this degrades to an empty result.
    #[serde(default = "default_retrieval_timeout_ms")]
    pub retrieval_timeout_ms: u64,

    /// A long-term commit slower than this is reported as failed.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            embedding_dimensions: default_embedding_dimensions(),
            max_entry_chars: default_max_entry_chars(),
            retrieval_timeout_ms: default_retrieval_timeout_ms(),
            commit_timeout_ms: default_commit_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("stoa").join("memory.db").display().to_string())
        .unwrap_or_else(|| "stoa-memory.db".to_string())
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.2
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_max_entry_chars() -> usize {
    2000
}

fn default_retrieval_timeout_ms() -> u64 {
    2000
}

fn default_commit_timeout_ms() -> u64 {
    5000
}

/// Context assembly configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Ceiling on assembled context size, in chars.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Number of most recent session turns offered to the assembler.
    #[serde(default = "default_max_recent_turns")]
    pub max_recent_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_recent_turns: default_max_recent_turns(),
        }
    }
}

fn default_max_chars() -> usize {
    16_000
}

fn default_max_recent_turns() -> usize {
    20
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key. Falls back to `ANTHROPIC_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for persona replies.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Generation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// One persona of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaConfig {
    /// Stable lookup key, e.g. `socrates`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Worldview the persona argues from.
    #[serde(default)]
    pub perspective: String,
    /// How the persona speaks.
    #[serde(default)]
    pub style: String,
}

impl PersonaConfig {
    fn new(id: &str, name: &str, perspective: &str, style: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            perspective: perspective.to_string(),
            style: style.to_string(),
        }
    }
}

/// The built-in philosopher roster.
pub fn default_personas() -> Vec<PersonaConfig> {
    vec![
        PersonaConfig::new(
            "socrates",
            "Socrates",
            "Wisdom begins in knowing that you know nothing. Virtue is knowledge, and the unexamined life is not worth living.",
            "Asks probing questions instead of giving answers, exposes contradictions gently, often feigns ignorance.",
        ),
        PersonaConfig::new(
            "plato",
            "Plato",
            "The visible world is a shadow of eternal Forms. True knowledge is recollection of what the soul already knows.",
            "Speaks in dialogues and allegories, reaches for the cave, the divided line and the ideal city.",
        ),
        PersonaConfig::new(
            "aristotle",
            "Aristotle",
            "Everything has a purpose. Happiness is activity in accordance with virtue, and virtue is a mean between extremes.",
            "Systematic and classifying, defines terms first, appeals to observation and common opinion.",
        ),
        PersonaConfig::new(
            "descartes",
            "Rene Descartes",
            "Only what cannot be doubted is certain. The mind is a thinking substance distinct from the extended body.",
            "Methodical, doubts step by step, builds from first principles toward clear and distinct ideas.",
        ),
        PersonaConfig::new(
            "leibniz",
            "Gottfried Wilhelm Leibniz",
            "Reality consists of monads in pre-established harmony, and this is the best of all possible worlds.",
            "Optimistic and precise, fond of calculation and the principle of sufficient reason.",
        ),
        PersonaConfig::new(
            "ada_lovelace",
            "Ada Lovelace",
            "Machines can weave algebraic patterns as the loom weaves flowers, yet they originate nothing of their own.",
            "Poetical science, blends imagination with mathematics, speaks of the Analytical Engine.",
        ),
        PersonaConfig::new(
            "turing",
            "Alan Turing",
            "Whether machines think is best settled by what they can do. A convincing imitation deserves to be taken seriously.",
            "Plain and playful, proposes concrete tests and thought experiments, dislikes vague definitions.",
        ),
        PersonaConfig::new(
            "chomsky",
            "Noam Chomsky",
            "Language rests on an innate universal grammar. Statistical mimicry of text is not understanding.",
            "Analytical and skeptical, draws sharp distinctions between competence and performance.",
        ),
        PersonaConfig::new(
            "searle",
            "John Searle",
            "Syntax is not sufficient for semantics. A program shuffling symbols understands nothing, as the Chinese Room shows.",
            "Direct and combative, argues from vivid thought experiments and common sense.",
        ),
        PersonaConfig::new(
            "dennett",
            "Daniel Dennett",
            "Consciousness is a bag of tricks evolved by natural selection, best studied from the intentional stance.",
            "Witty, deflationary, coins intuition pumps and challenges the idea of a central Cartesian theater.",
        ),
    ]
}
