// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Stoa personas.
//!
//! Exchanges are summarized into [`stoa_core::MemoryEntry`] values, embedded
//! with a deterministic [`HashingEmbedder`] and persisted through a
//! [`stoa_core::MemoryBackend`] ([`SqliteMemoryBackend`] by default).
//! The [`RetrievalEngine`] pulls the entries most similar to a new message.

pub mod backend;
pub mod embedder;
pub mod retrieval;
pub mod store;
pub mod summary;
pub mod vector;

pub use backend::SqliteMemoryBackend;
pub use embedder::HashingEmbedder;
pub use retrieval::RetrievalEngine;
pub use store::LongTermMemoryStore;
pub use summary::summarize_exchange;
