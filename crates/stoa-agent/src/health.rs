// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degraded-mode signal for long-term memory.
//!
//! Retrieval and commit failures never fail a response. They are logged,
//! counted here and exported as `metrics` counters so an operator can tell
//! that personas are answering without their memory.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use stoa_core::types::HealthStatus;

/// An absorbed long-term memory failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryDegradation {
    /// Retrieval failed or timed out; the response went ahead without memory.
    RetrievalDegraded { persona_id: String, reason: String },
    /// A completed exchange could not be committed to long-term memory.
    CommitFailure { persona_id: String, reason: String },
}

impl std::fmt::Display for MemoryDegradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryDegradation::RetrievalDegraded { persona_id, reason } => {
                write!(f, "retrieval degraded for {persona_id}: {reason}")
            }
            MemoryDegradation::CommitFailure { persona_id, reason } => {
                write!(f, "commit failed for {persona_id}: {reason}")
            }
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryHealthSnapshot {
    pub retrieval_degraded: u64,
    pub commit_failures: u64,
    pub commits: u64,
    pub last_degradation: Option<MemoryDegradation>,
}

/// Counters of absorbed memory failures, shared by the orchestrator and its
/// detached commit tasks.
#[derive(Debug, Default)]
pub struct MemoryHealth {
    retrieval_degraded: AtomicU64,
    commit_failures: AtomicU64,
    commits: AtomicU64,
    retrieval_failing: AtomicBool,
    commit_failing: AtomicBool,
    last: Mutex<Option<MemoryDegradation>>,
}

impl MemoryHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: MemoryDegradation) {
        match &event {
            MemoryDegradation::RetrievalDegraded { persona_id, .. } => {
                self.retrieval_degraded.fetch_add(1, Ordering::Relaxed);
                self.retrieval_failing.store(true, Ordering::Relaxed);
                metrics::counter!("stoa_retrieval_degraded_total", "persona" => persona_id.clone())
                    .increment(1);
            }
            MemoryDegradation::CommitFailure { persona_id, .. } => {
                self.commit_failures.fetch_add(1, Ordering::Relaxed);
                self.commit_failing.store(true, Ordering::Relaxed);
                metrics::counter!("stoa_commit_failures_total", "persona" => persona_id.clone())
                    .increment(1);
            }
        }
        if let Ok(mut last) = self.last.lock() {
            *last = Some(event);
        }
    }

    pub fn record_retrieval_ok(&self) {
        self.retrieval_failing.store(false, Ordering::Relaxed);
    }

    pub fn record_commit_ok(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.commit_failing.store(false, Ordering::Relaxed);
        metrics::counter!("stoa_commits_total").increment(1);
    }

    pub fn snapshot(&self) -> MemoryHealthSnapshot {
        MemoryHealthSnapshot {
            retrieval_degraded: self.retrieval_degraded.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            last_degradation: self.last.lock().ok().and_then(|last| last.clone()),
        }
    }

    /// `Degraded` while the latest retrieval or commit attempt failed.
    pub fn status(&self) -> HealthStatus {
        let retrieval = self.retrieval_failing.load(Ordering::Relaxed);
        let commit = self.commit_failing.load(Ordering::Relaxed);
        if !retrieval && !commit {
            return HealthStatus::Healthy;
        }
        let detail = self
            .snapshot()
            .last_degradation
            .map(|d| d.to_string())
            .unwrap_or_else(|| "long-term memory unavailable".to_string());
        HealthStatus::Degraded(detail)
    }
}
