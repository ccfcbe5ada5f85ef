// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete [`AgentRuntime`] with a mock provider,
//! a temp SQLite memory database behind a [`FlakyBackend`], and the hashing
//! embedder.

use std::sync::Arc;

use stoa_agent::{AgentRuntime, CommitOutcome};
use stoa_config::StoaConfig;
use stoa_core::StoaError;
use stoa_core::traits::MemoryBackend;
use stoa_core::types::{MemoryEntry, SessionKey};
use stoa_memory::{HashingEmbedder, SqliteMemoryBackend};

use crate::flaky_backend::FlakyBackend;
use crate::mock_provider::MockProvider;

/// Embedding width used by the harness; wide enough that unrelated test
/// sentences rarely share buckets.
const HARNESS_DIMENSIONS: usize = 1024;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: StoaConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = StoaConfig::default();
        config.memory.embedding_dimensions = HARNESS_DIMENSIONS;
        Self {
            responses: Vec::new(),
            config,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Adjust the configuration before the runtime is wired.
    pub fn with_config(mut self, adjust: impl FnOnce(&mut StoaConfig)) -> Self {
        adjust(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, StoaError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| StoaError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("memory.db");

        let mut config = self.config;
        config.memory.database_path = db_path.to_string_lossy().to_string();

        let sqlite = SqliteMemoryBackend::open(&db_path, config.memory.wal_mode).await?;
        let backend = Arc::new(FlakyBackend::new(Arc::new(sqlite)));
        let embedder = Arc::new(HashingEmbedder::new(config.memory.embedding_dimensions)?);
        let provider = Arc::new(MockProvider::with_responses(self.responses));

        let runtime = AgentRuntime::new(
            &config,
            provider.clone(),
            backend.clone(),
            embedder.clone(),
        )?;

        Ok(TestHarness {
            runtime,
            provider,
            backend,
            embedder,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The runtime under test.
    pub runtime: AgentRuntime,
    /// The mock generation provider.
    pub provider: Arc<MockProvider>,
    /// The memory backend, with failure switches.
    pub backend: Arc<FlakyBackend>,
    /// The embedder shared with the runtime.
    pub embedder: Arc<HashingEmbedder>,
    /// Configuration the runtime was built from.
    pub config: StoaConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Responds in the persona's default conversation and waits for the
    /// long-term commit to finish.
    pub async fn respond_and_commit(
        &self,
        persona_id: &str,
        message: &str,
    ) -> Result<(String, CommitOutcome), StoaError> {
        let response = self
            .runtime
            .respond_in(&SessionKey::persona(persona_id), message)
            .await?;
        let outcome = response.commit.wait().await;
        Ok((response.text, outcome))
    }

    /// Writes an entry for `persona_id` straight into the backend.
    pub async fn seed_memory(&self, persona_id: &str, content: &str) -> Result<(), StoaError> {
        let entry = MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            persona_id: persona_id.to_string(),
            content: content.to_string(),
            embedding: self.embedder.embed_text(content),
            created_at: chrono::Utc::now(),
        };
        self.backend.insert(&entry).await
    }

    /// Add a response to the mock provider's queue.
    pub async fn add_provider_response(&self, text: impl Into<String>) {
        self.provider.add_response(text).await;
    }
}
