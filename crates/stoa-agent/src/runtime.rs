// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fully wired persona runtime.

use std::sync::Arc;

use tracing::{info, warn};

use stoa_config::StoaConfig;
use stoa_context::ContextAssembler;
use stoa_core::error::StoaError;
use stoa_core::traits::{EmbeddingAdapter, MemoryBackend, ProviderAdapter};
use stoa_core::types::{PersonaDescriptor, ResetScope, SessionKey, Turn};
use stoa_memory::{HashingEmbedder, LongTermMemoryStore, RetrievalEngine, SqliteMemoryBackend};

use crate::health::MemoryHealth;
use crate::orchestrator::{OrchestratorParts, OrchestratorSettings, Response, ResponseOrchestrator};
use crate::persona::PersonaRegistry;
use crate::reset::{ResetController, ResetReport};
use crate::session::SessionStore;

/// Entry point for callers: respond, reset and list personas.
pub struct AgentRuntime {
    registry: Arc<PersonaRegistry>,
    sessions: Arc<SessionStore>,
    memory: Arc<LongTermMemoryStore>,
    orchestrator: ResponseOrchestrator,
    reset: ResetController,
    provider: Arc<dyn ProviderAdapter>,
}

impl AgentRuntime {
    /// Wires a runtime from configuration and its three I/O collaborators.
    pub fn new(
        config: &StoaConfig,
        provider: Arc<dyn ProviderAdapter>,
        backend: Arc<dyn MemoryBackend>,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, StoaError> {
        let registry = Arc::new(PersonaRegistry::from_config(&config.personas)?);
        let sessions = Arc::new(SessionStore::for_registry(&registry));
        let memory = Arc::new(LongTermMemoryStore::new(backend, embedder));
        let retrieval = Arc::new(RetrievalEngine::from_config(memory.clone(), &config.memory));

        let orchestrator = ResponseOrchestrator::new(
            OrchestratorParts {
                registry: registry.clone(),
                sessions: sessions.clone(),
                memory: memory.clone(),
                retrieval,
                assembler: ContextAssembler::from_config(&config.context),
                provider: provider.clone(),
                health: Arc::new(MemoryHealth::new()),
            },
            OrchestratorSettings::from_config(config),
        );
        let reset = ResetController::new(registry.clone(), sessions.clone(), memory.clone());

        info!(
            personas = registry.len(),
            provider = provider.name(),
            "agent runtime ready"
        );
        Ok(Self {
            registry,
            sessions,
            memory,
            orchestrator,
            reset,
            provider,
        })
    }

    /// Opens the SQLite memory database named in `config` with the hashing
    /// embedder and wires a runtime around `provider`.
    pub async fn open(
        config: &StoaConfig,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Result<Self, StoaError> {
        let backend =
            SqliteMemoryBackend::open(&config.memory.database_path, config.memory.wal_mode).await?;
        let embedder = HashingEmbedder::new(config.memory.embedding_dimensions)?;
        Self::new(config, provider, Arc::new(backend), Arc::new(embedder))
    }

    /// Replies as `persona_id` in its default conversation.
    pub async fn respond(&self, persona_id: &str, message: &str) -> Result<String, StoaError> {
        self.orchestrator.respond(persona_id, message).await
    }

    /// Replies in a specific conversation, exposing the commit handle.
    pub async fn respond_in(&self, key: &SessionKey, message: &str) -> Result<Response, StoaError> {
        self.orchestrator.respond_in(key, message).await
    }

    pub async fn reset(&self, persona_id: &str, scope: ResetScope) -> Result<ResetReport, StoaError> {
        self.reset.reset(persona_id, scope).await
    }

    pub async fn reset_all(&self, scope: ResetScope) -> Result<Vec<ResetReport>, StoaError> {
        self.reset.reset_all(scope).await
    }

    /// The registered personas in roster order.
    pub fn personas(&self) -> &[PersonaDescriptor] {
        self.registry.list()
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn health(&self) -> &Arc<MemoryHealth> {
        self.orchestrator.health()
    }

    /// Long-term entries stored for `persona_id`.
    pub async fn count(&self, persona_id: &str) -> Result<u64, StoaError> {
        self.registry.get(persona_id)?;
        self.memory.count(persona_id).await
    }

    /// The last `max_turns` turns of a conversation.
    pub async fn recent(&self, key: &SessionKey, max_turns: usize) -> Result<Vec<Turn>, StoaError> {
        self.registry.get(&key.persona_id)?;
        Ok(self.sessions.recent(key, max_turns).await)
    }

    /// Waits for pending commits, then shuts down the collaborators.
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
        if let Err(e) = self.provider.shutdown().await {
            warn!(error = %e, "provider shutdown failed");
        }
        if let Err(e) = self.memory.backend().shutdown().await {
            warn!(error = %e, "memory backend shutdown failed");
        }
        info!("agent runtime stopped");
    }
}
