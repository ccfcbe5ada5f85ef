// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Stoa, the persona conversation memory system.
//!
//! This crate provides the error type, the conversation and memory data
//! model, and the adapter traits behind which the generation model, the
//! embedder and the long-term memory backend live.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, StoaError};
pub use types::{
    AdapterType, AssembledContext, DEFAULT_CONVERSATION, HealthStatus, MemoryEntry,
    NewMemoryEntry, PersonaDescriptor, ResetScope, RetrievedContext, Role, Session, SessionKey,
    Turn,
};

pub use traits::{EmbeddingAdapter, MemoryBackend, PluginAdapter, ProviderAdapter};
