// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory reset per persona.

use std::sync::Arc;

use tracing::{info, warn};

use stoa_core::error::StoaError;
use stoa_core::types::ResetScope;
use stoa_memory::LongTermMemoryStore;

use crate::persona::PersonaRegistry;
use crate::session::SessionStore;

/// What a reset removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub persona_id: String,
    pub scope: ResetScope,
    pub turns_cleared: usize,
    pub entries_deleted: u64,
}

/// Clears short-term and/or long-term memory of a persona.
pub struct ResetController {
    registry: Arc<PersonaRegistry>,
    sessions: Arc<SessionStore>,
    memory: Arc<LongTermMemoryStore>,
}

impl ResetController {
    pub fn new(
        registry: Arc<PersonaRegistry>,
        sessions: Arc<SessionStore>,
        memory: Arc<LongTermMemoryStore>,
    ) -> Self {
        Self {
            registry,
            sessions,
            memory,
        }
    }

    /// Resets `scope` for `persona_id`.
    ///
    /// `both` clears the session first, then long-term memory. On a
    /// long-term failure the session stays cleared and the error names the
    /// long-term scope.
    pub async fn reset(&self, persona_id: &str, scope: ResetScope) -> Result<ResetReport, StoaError> {
        self.registry.get(persona_id)?;

        let turns_cleared = if scope.includes_short_term() {
            self.sessions.clear_persona(persona_id).await
        } else {
            0
        };

        let entries_deleted = if scope.includes_long_term() {
            match self.memory.clear(persona_id).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    warn!(persona_id, %scope, error = %e, "long-term reset failed");
                    return Err(StoaError::ResetFailed {
                        scope: ResetScope::LongTerm,
                        source: Box::new(e),
                    });
                }
            }
        } else {
            0
        };

        info!(persona_id, %scope, turns_cleared, entries_deleted, "persona memory reset");
        Ok(ResetReport {
            persona_id: persona_id.to_string(),
            scope,
            turns_cleared,
            entries_deleted,
        })
    }

    /// Resets `scope` for every registered persona, in registry order.
    ///
    /// Stops at the first failure.
    pub async fn reset_all(&self, scope: ResetScope) -> Result<Vec<ResetReport>, StoaError> {
        let mut reports = Vec::with_capacity(self.registry.len());
        for id in self.registry.ids() {
            reports.push(self.reset(id, scope).await?);
        }
        Ok(reports)
    }
}
