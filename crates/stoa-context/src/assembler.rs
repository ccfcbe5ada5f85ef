// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size-bounded assembly of the per-request context.
//!
//! The persona fields and the newest user message are mandatory. When the
//! rest does not fit, the oldest history turns are dropped first. Retrieved
//! entries are dropped, least relevant first, only when the full digest does
//! not fit even with no history at all.

use tracing::debug;

use stoa_config::ContextConfig;
use stoa_core::error::StoaError;
use stoa_core::types::{AssembledContext, PersonaDescriptor, RetrievedContext, Turn, char_len};

use crate::digest::render_digest;

/// Builds [`AssembledContext`] values under a char ceiling.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Assembles the context for `message`, the newest user turn.
    ///
    /// `history` is the session's recent turns in conversational order and
    /// must not already contain `message`. Fails with
    /// [`StoaError::ContextTooLarge`] when the persona and `message` alone
    /// exceed the ceiling.
    pub fn build(
        &self,
        persona: &PersonaDescriptor,
        history: &[Turn],
        message: Turn,
        retrieved: &RetrievedContext,
    ) -> Result<AssembledContext, StoaError> {
        let required = persona.size() + message.size();
        if required > self.max_chars {
            return Err(StoaError::ContextTooLarge {
                required,
                ceiling: self.max_chars,
            });
        }
        let budget = self.max_chars - required;

        let mut kept_entries = retrieved.clone();
        let mut summary = render_digest(&kept_entries);
        let kept_turns = if char_len(&summary) <= budget {
            fit_suffix(history, budget - char_len(&summary))
        } else {
            // History is already gone; shed entries until the digest fits.
            while char_len(&summary) > budget {
                kept_entries.pop_least_relevant();
                summary = render_digest(&kept_entries);
            }
            0
        };

        let mut recent_turns = history[history.len() - kept_turns..].to_vec();
        recent_turns.push(message);

        let dropped_turns = history.len() - kept_turns;
        let dropped_entries = retrieved.len() - kept_entries.len();
        if dropped_turns > 0 || dropped_entries > 0 {
            debug!(
                persona_id = %persona.id,
                dropped_turns,
                dropped_entries,
                ceiling = self.max_chars,
                "context trimmed to fit ceiling"
            );
        }

        Ok(AssembledContext {
            persona: persona.clone(),
            retrieved_summary: summary,
            recent_turns,
        })
    }
}

/// Number of newest turns of `history` that fit in `budget` chars.
fn fit_suffix(history: &[Turn], mut budget: usize) -> usize {
    let mut kept = 0;
    for turn in history.iter().rev() {
        let size = turn.size();
        if size > budget {
            break;
        }
        budget -= size;
        kept += 1;
    }
    kept
}
