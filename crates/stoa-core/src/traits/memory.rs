// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence and similarity search for long-term memory entries.

use async_trait::async_trait;

use crate::error::StoaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::MemoryEntry;

/// Backend that stores memory entries and searches them by similarity.
///
/// Every operation is scoped to a single persona. A backend must never return
/// an entry whose `persona_id` differs from the one queried.
#[async_trait]
pub trait MemoryBackend: PluginAdapter {
    /// Persists a fully formed entry.
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), StoaError>;

    /// Returns up to `limit` entries of `persona_id` with their similarity to
    /// `embedding`, highest score first, ties broken by newest `created_at`.
    async fn search(
        &self,
        persona_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryEntry, f32)>, StoaError>;

    /// Deletes every entry of `persona_id`, returning how many were removed.
    async fn delete_persona(&self, persona_id: &str) -> Result<u64, StoaError>;

    /// Number of entries stored for `persona_id`.
    async fn count(&self, persona_id: &str) -> Result<u64, StoaError>;
}
