// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Stoa conversation memory core.

use thiserror::Error;

use crate::types::ResetScope;

/// Boxed source error carried by storage and provider failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all Stoa adapter traits and core operations.
#[derive(Debug, Error)]
pub enum StoaError {
    /// The requested persona id is not registered.
    #[error("unknown persona: {id}")]
    UnknownPersona { id: String },

    /// The mandatory context parts alone exceed the configured ceiling.
    #[error("context too large: {required} chars required, ceiling is {ceiling}")]
    ContextTooLarge { required: usize, ceiling: usize },

    /// The generation collaborator failed or timed out.
    #[error("generation failed: {message}")]
    Generation {
        message: String,
        source: Option<BoxError>,
    },

    /// A reset did not complete. `scope` names the part that failed.
    #[error("reset of {scope} memory failed: {source}")]
    ResetFailed { scope: ResetScope, source: BoxError },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoaError {
    /// Builds an [`StoaError::UnknownPersona`] for `id`.
    pub fn unknown_persona(id: impl Into<String>) -> Self {
        Self::UnknownPersona { id: id.into() }
    }

    /// Builds a [`StoaError::Generation`] without a source.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any displayable error as a [`StoaError::Storage`].
    pub fn storage(e: impl std::fmt::Display) -> Self {
        Self::Storage {
            source: e.to_string().into(),
        }
    }

    /// Returns true for errors that the core reports to its caller
    /// rather than absorbing as degraded memory.
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            Self::UnknownPersona { .. }
                | Self::ContextTooLarge { .. }
                | Self::Generation { .. }
                | Self::ResetFailed { .. }
        )
    }
}
