// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance-filtered retrieval for the newest user message.

use std::sync::Arc;

use tracing::debug;

use stoa_config::MemoryConfig;
use stoa_core::error::StoaError;
use stoa_core::types::RetrievedContext;

use crate::store::LongTermMemoryStore;

/// Top-k similarity retrieval with a minimum score.
pub struct RetrievalEngine {
    store: Arc<LongTermMemoryStore>,
    top_k: usize,
    min_score: f32,
}

impl RetrievalEngine {
    pub fn new(store: Arc<LongTermMemoryStore>, top_k: usize, min_score: f32) -> Self {
        Self {
            store,
            top_k,
            min_score,
        }
    }

    pub fn from_config(store: Arc<LongTermMemoryStore>, config: &MemoryConfig) -> Self {
        Self::new(store, config.top_k, config.similarity_threshold)
    }

    /// Entries of `persona_id` relevant to `message`, most relevant first.
    pub async fn query(
        &self,
        persona_id: &str,
        message: &str,
    ) -> Result<RetrievedContext, StoaError> {
        let mut ctx = self.store.query(persona_id, message, self.top_k).await?;
        let candidates = ctx.len();
        ctx.retain_min_score(self.min_score);
        debug!(
            persona_id,
            candidates,
            retrieved = ctx.len(),
            "memory retrieval complete"
        );
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteMemoryBackend;
    use crate::embedder::HashingEmbedder;
    use stoa_core::types::NewMemoryEntry;

    async fn engine(top_k: usize, min_score: f32) -> (Arc<LongTermMemoryStore>, RetrievalEngine) {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        let store = Arc::new(LongTermMemoryStore::new(
            Arc::new(backend),
            Arc::new(HashingEmbedder::new(1024).unwrap()),
        ));
        (store.clone(), RetrievalEngine::new(store, top_k, min_score))
    }

    async fn commit(store: &LongTermMemoryStore, content: &str) {
        store
            .commit(NewMemoryEntry {
                persona_id: "socrates".into(),
                content: content.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_store_yields_empty_context() {
        let (_, engine) = engine(3, 0.0).await;
        assert!(engine.query("socrates", "What is virtue?").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn threshold_filters_unrelated_entries() {
        let (store, engine) = engine(5, 0.3).await;
        commit(&store, "User asked: What is virtue? Socrates answered: virtue is knowledge").await;
        commit(&store, "zebra quantum xylophone marmalade telescope harbor").await;

        let ctx = engine.query("socrates", "what is virtue").await.unwrap();
        assert_eq!(ctx.len(), 1);
        assert!(ctx.entries[0].content.contains("virtue"));
        assert!(ctx.scores[0] >= 0.3);
    }

    #[tokio::test]
    async fn top_k_caps_results() {
        let (store, engine) = engine(2, -1.0).await;
        for i in 0..4 {
            commit(&store, &format!("justice dialogue {i}")).await;
        }
        let ctx = engine.query("socrates", "justice").await.unwrap();
        assert_eq!(ctx.len(), 2);
    }

    #[tokio::test]
    async fn from_config_uses_memory_settings() {
        let (store, _) = engine(1, 0.0).await;
        let mut config = MemoryConfig::default();
        config.top_k = 1;
        config.similarity_threshold = -1.0;
        let engine = RetrievalEngine::from_config(store.clone(), &config);
        commit(&store, "first").await;
        commit(&store, "second").await;
        assert_eq!(engine.query("socrates", "anything").await.unwrap().len(), 1);
    }
}
