// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! numeric ranges, non-empty paths and a well-formed persona roster.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{PersonaConfig, StoaConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &StoaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let memory = &config.memory;
    if memory.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("memory.database_path", "must not be empty"));
    }
    if memory.top_k < 1 {
        errors.push(ConfigError::invalid(
            "memory.top_k",
            format!("must be at least 1, got {}", memory.top_k),
        ));
    }
    if !(-1.0..=1.0).contains(&memory.similarity_threshold) {
        errors.push(ConfigError::invalid(
            "memory.similarity_threshold",
            format!(
                "must be between -1.0 and 1.0, got {}",
                memory.similarity_threshold
            ),
        ));
    }
    if memory.embedding_dimensions < 8 {
        errors.push(ConfigError::invalid(
            "memory.embedding_dimensions",
            format!("must be at least 8, got {}", memory.embedding_dimensions),
        ));
    }
    if memory.max_entry_chars < 16 {
        errors.push(ConfigError::invalid(
            "memory.max_entry_chars",
            format!("must be at least 16, got {}", memory.max_entry_chars),
        ));
    }
    for (key, value) in [
        ("memory.retrieval_timeout_ms", memory.retrieval_timeout_ms),
        ("memory.commit_timeout_ms", memory.commit_timeout_ms),
        ("anthropic.timeout_secs", config.anthropic.timeout_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(key, "must be greater than 0"));
        }
    }

    if config.context.max_chars < 1 {
        errors.push(ConfigError::invalid("context.max_chars", "must be at least 1"));
    }
    if config.context.max_recent_turns < 1 {
        errors.push(ConfigError::invalid(
            "context.max_recent_turns",
            "must be at least 1",
        ));
    }

    errors.extend(validate_personas(&config.personas));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a persona roster: non-empty, every id and name set, ids unique.
pub fn validate_personas(personas: &[PersonaConfig]) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if personas.is_empty() {
        errors.push(ConfigError::invalid(
            "personas",
            "at least one persona must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for (i, persona) in personas.iter().enumerate() {
        let id = persona.id.trim();
        if id.is_empty() {
            errors.push(ConfigError::invalid(
                format!("personas[{i}].id"),
                "must not be empty",
            ));
        } else if !seen.insert(id) {
            errors.push(ConfigError::invalid(
                format!("personas[{i}].id"),
                format!("duplicate persona id `{id}`"),
            ));
        }
        if persona.name.trim().is_empty() {
            errors.push(ConfigError::invalid(
                format!("personas[{i}].name"),
                "must not be empty",
            ));
        }
    }

    errors
}
