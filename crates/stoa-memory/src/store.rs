// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-persona long-term memory over a pluggable backend.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use stoa_core::error::StoaError;
use stoa_core::traits::{EmbeddingAdapter, MemoryBackend};
use stoa_core::types::{EmbeddingInput, MemoryEntry, NewMemoryEntry, RetrievedContext};

use crate::vector::rank;

/// Long-term memory: commits, similarity queries and per-persona clears.
///
/// Each persona has an epoch counter behind an async `RwLock`. Commits hold
/// the read side for their whole write, `clear` holds the write side, so a
/// clear waits for in-flight commits and removes them too. Queries take no
/// lock and never wait on a commit.
pub struct LongTermMemoryStore {
    backend: Arc<dyn MemoryBackend>,
    embedder: Arc<dyn EmbeddingAdapter>,
    epochs: DashMap<String, Arc<RwLock<u64>>>,
}

impl LongTermMemoryStore {
    pub fn new(backend: Arc<dyn MemoryBackend>, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        Self {
            backend,
            embedder,
            epochs: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MemoryBackend> {
        &self.backend
    }

    fn epoch_lock(&self, persona_id: &str) -> Arc<RwLock<u64>> {
        self.epochs
            .entry(persona_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Current clear epoch of `persona_id`. Starts at 0.
    pub async fn epoch(&self, persona_id: &str) -> u64 {
        *self.epoch_lock(persona_id).read().await
    }

    /// Embeds and persists `entry`, assigning its id and `created_at`.
    pub async fn commit(&self, entry: NewMemoryEntry) -> Result<MemoryEntry, StoaError> {
        let lock = self.epoch_lock(&entry.persona_id);
        let _epoch = lock.read().await;
        self.persist(entry).await
    }

    /// Like [`commit`](Self::commit), but writes nothing and returns `None`
    /// when `persona_id` was cleared after `epoch` was observed.
    pub async fn commit_if_current(
        &self,
        entry: NewMemoryEntry,
        epoch: u64,
    ) -> Result<Option<MemoryEntry>, StoaError> {
        let lock = self.epoch_lock(&entry.persona_id);
        let current = lock.read().await;
        if *current != epoch {
            debug!(
                persona_id = %entry.persona_id,
                expected = epoch,
                current = *current,
                "dropping memory entry computed before a reset"
            );
            return Ok(None);
        }
        self.persist(entry).await.map(Some)
    }

    async fn persist(&self, entry: NewMemoryEntry) -> Result<MemoryEntry, StoaError> {
        let embedding = self.embed_one(&entry.content).await?;
        let stored = MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            persona_id: entry.persona_id,
            content: entry.content,
            embedding,
            created_at: Utc::now(),
        };
        self.backend.insert(&stored).await?;
        debug!(persona_id = %stored.persona_id, entry_id = %stored.id, "memory entry committed");
        Ok(stored)
    }

    /// Up to `top_k` entries of `persona_id` most similar to `text`.
    ///
    /// Scores descend; equal scores put the newest entry first. A persona
    /// without entries yields an empty context, not an error.
    pub async fn query(
        &self,
        persona_id: &str,
        text: &str,
        top_k: usize,
    ) -> Result<RetrievedContext, StoaError> {
        if top_k == 0 {
            return Ok(RetrievedContext::empty());
        }

        let embedding = self.embed_one(text).await?;
        let mut results = self.backend.search(persona_id, &embedding, top_k).await?;
        results.retain(|(entry, _)| entry.persona_id == persona_id);
        rank(&mut results);
        results.truncate(top_k);
        Ok(RetrievedContext::from_ranked(results))
    }

    /// Deletes every entry of `persona_id`. Irreversible.
    pub async fn clear(&self, persona_id: &str) -> Result<u64, StoaError> {
        let lock = self.epoch_lock(persona_id);
        let mut epoch = lock.write().await;
        let deleted = self.backend.delete_persona(persona_id).await?;
        *epoch += 1;
        info!(persona_id, deleted, "long-term memory cleared");
        Ok(deleted)
    }

    pub async fn count(&self, persona_id: &str) -> Result<u64, StoaError> {
        self.backend.count(persona_id).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, StoaError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| StoaError::Embedding("embedder returned no vector".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteMemoryBackend;
    use crate::embedder::HashingEmbedder;

    async fn store() -> LongTermMemoryStore {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        LongTermMemoryStore::new(
            Arc::new(backend),
            Arc::new(HashingEmbedder::new(256).unwrap()),
        )
    }

    fn new_entry(persona_id: &str, content: &str) -> NewMemoryEntry {
        NewMemoryEntry {
            persona_id: persona_id.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn commit_assigns_id_and_embedding() {
        let store = store().await;
        let entry = store
            .commit(new_entry("socrates", "User asked about virtue"))
            .await
            .unwrap();
        assert!(!entry.id.is_empty());
        assert_eq!(entry.embedding.len(), 256);
        assert_eq!(store.count("socrates").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_unknown_history_is_empty() {
        let store = store().await;
        let ctx = store.query("plato", "What are the Forms?", 5).await.unwrap();
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn query_with_zero_top_k_is_empty() {
        let store = store().await;
        store.commit(new_entry("plato", "the cave")).await.unwrap();
        assert!(store.query("plato", "the cave", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_returns_most_similar_first() {
        let store = store().await;
        store
            .commit(new_entry("aristotle", "virtue is a mean between extremes"))
            .await
            .unwrap();
        store
            .commit(new_entry("aristotle", "the four causes of change"))
            .await
            .unwrap();

        let ctx = store
            .query("aristotle", "is courage a virtue between extremes", 2)
            .await
            .unwrap();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.entries[0].content, "virtue is a mean between extremes");
        assert!(ctx.scores[0] >= ctx.scores[1]);
    }

    #[tokio::test]
    async fn query_never_crosses_personas() {
        let store = store().await;
        store
            .commit(new_entry("descartes", "cogito ergo sum"))
            .await
            .unwrap();
        let ctx = store.query("turing", "cogito ergo sum", 5).await.unwrap();
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn clear_empties_persona_and_bumps_epoch() {
        let store = store().await;
        for i in 0..5 {
            store
                .commit(new_entry("aristotle", &format!("exchange {i}")))
                .await
                .unwrap();
        }
        store.commit(new_entry("plato", "kept")).await.unwrap();

        assert_eq!(store.epoch("aristotle").await, 0);
        assert_eq!(store.clear("aristotle").await.unwrap(), 5);
        assert_eq!(store.epoch("aristotle").await, 1);
        assert_eq!(store.count("aristotle").await.unwrap(), 0);
        for k in [1, 3, 10] {
            assert!(store.query("aristotle", "exchange", k).await.unwrap().is_empty());
        }
        assert_eq!(store.count("plato").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_commit_is_dropped_after_clear() {
        let store = store().await;
        let epoch = store.epoch("searle").await;
        store.clear("searle").await.unwrap();

        let committed = store
            .commit_if_current(new_entry("searle", "chinese room"), epoch)
            .await
            .unwrap();
        assert!(committed.is_none());
        assert_eq!(store.count("searle").await.unwrap(), 0);

        let fresh = store.epoch("searle").await;
        let committed = store
            .commit_if_current(new_entry("searle", "chinese room"), fresh)
            .await
            .unwrap();
        assert!(committed.is_some());
        assert_eq!(store.count("searle").await.unwrap(), 1);
    }
}
