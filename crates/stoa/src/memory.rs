// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `stoa reset` and `stoa count`: long-term memory maintenance without a
//! provider.

use std::sync::Arc;

use colored::Colorize;

use stoa_agent::{PersonaRegistry, ResetController, ResetReport, SessionStore};
use stoa_config::StoaConfig;
use stoa_core::error::StoaError;
use stoa_core::traits::PluginAdapter;
use stoa_core::types::ResetScope;
use stoa_memory::{HashingEmbedder, LongTermMemoryStore, SqliteMemoryBackend};

struct MemoryTools {
    registry: Arc<PersonaRegistry>,
    memory: Arc<LongTermMemoryStore>,
    reset: ResetController,
}

impl MemoryTools {
    async fn open(config: &StoaConfig) -> Result<Self, StoaError> {
        let registry = Arc::new(PersonaRegistry::from_config(&config.personas)?);
        // Sessions live only inside a running shell, so this store starts empty.
        let sessions = Arc::new(SessionStore::for_registry(&registry));
        let backend =
            SqliteMemoryBackend::open(&config.memory.database_path, config.memory.wal_mode).await?;
        let embedder = HashingEmbedder::new(config.memory.embedding_dimensions)?;
        let memory = Arc::new(LongTermMemoryStore::new(
            Arc::new(backend),
            Arc::new(embedder),
        ));
        let reset = ResetController::new(registry.clone(), sessions, memory.clone());
        Ok(Self {
            registry,
            memory,
            reset,
        })
    }

    async fn close(&self) {
        if let Err(e) = self.memory.backend().shutdown().await {
            tracing::warn!(error = %e, "memory backend shutdown failed");
        }
    }
}

/// Resets one persona, or every persona when `all` is set.
pub async fn run_reset(
    config: &StoaConfig,
    persona: Option<&str>,
    all: bool,
    scope: ResetScope,
) -> Result<(), StoaError> {
    let tools = MemoryTools::open(config).await?;
    let result = match (persona, all) {
        (_, true) => tools.reset.reset_all(scope).await,
        (Some(id), false) => tools.reset.reset(id, scope).await.map(|r| vec![r]),
        (None, false) => Err(StoaError::Config(
            "reset needs --persona <id> or --all".into(),
        )),
    };
    tools.close().await;

    for report in result? {
        println!("{}", describe(&report));
    }
    Ok(())
}

/// Prints the long-term entry count of `persona_id`.
pub async fn run_count(config: &StoaConfig, persona_id: &str) -> Result<(), StoaError> {
    let tools = MemoryTools::open(config).await?;
    let result = match tools.registry.get(persona_id) {
        Ok(_) => tools.memory.count(persona_id).await,
        Err(e) => Err(e),
    };
    tools.close().await;

    println!("{persona_id}: {} long-term entries", result?);
    Ok(())
}

pub(crate) fn describe(report: &ResetReport) -> String {
    format!(
        "{} reset {} ({} turns, {} entries removed)",
        report.persona_id.bold(),
        report.scope,
        report.turns_cleared,
        report.entries_deleted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoa_core::types::NewMemoryEntry;

    fn config_in(dir: &tempfile::TempDir) -> StoaConfig {
        let mut config = StoaConfig::default();
        config.memory.database_path = dir.path().join("memory.db").display().to_string();
        config
    }

    #[tokio::test]
    async fn reset_clears_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let tools = MemoryTools::open(&config).await.unwrap();
        for content in ["User asked: a", "User asked: b"] {
            tools
                .memory
                .commit(NewMemoryEntry {
                    persona_id: "leibniz".into(),
                    content: content.into(),
                })
                .await
                .unwrap();
        }
        tools.close().await;

        run_reset(&config, Some("leibniz"), false, ResetScope::LongTerm)
            .await
            .unwrap();

        let tools = MemoryTools::open(&config).await.unwrap();
        assert_eq!(tools.memory.count("leibniz").await.unwrap(), 0);
        tools.close().await;
    }

    #[tokio::test]
    async fn count_rejects_unknown_persona() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_count(&config_in(&dir), "nietzsche").await.unwrap_err();
        assert!(matches!(err, StoaError::UnknownPersona { .. }));
    }

    #[tokio::test]
    async fn reset_all_succeeds_on_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        run_reset(&config_in(&dir), None, true, ResetScope::Both)
            .await
            .unwrap();
    }

    #[test]
    fn describe_mentions_scope_and_counts() {
        let text = describe(&ResetReport {
            persona_id: "searle".into(),
            scope: ResetScope::Both,
            turns_cleared: 4,
            entries_deleted: 2,
        });
        assert!(text.contains("searle"));
        assert!(text.contains("4 turns, 2 entries removed"));
    }
}
