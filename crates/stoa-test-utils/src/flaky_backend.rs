// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory backend wrapper with switchable failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use stoa_core::StoaError;
use stoa_core::traits::{MemoryBackend, PluginAdapter};
use stoa_core::types::{AdapterType, HealthStatus, MemoryEntry};

/// Delegates to an inner backend unless a failure switch is on.
///
/// Searches, inserts and deletes can be failed independently; `count`
/// always delegates so tests can inspect the inner state.
pub struct FlakyBackend {
    inner: Arc<dyn MemoryBackend>,
    fail_search: AtomicBool,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyBackend {
    pub fn new(inner: Arc<dyn MemoryBackend>) -> Self {
        Self {
            inner,
            fail_search: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StoaError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoaError::storage(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for FlakyBackend {
    fn name(&self) -> &str {
        "flaky-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MemoryBackend
    }

    async fn health_check(&self) -> Result<HealthStatus, StoaError> {
        if self.fail_search.load(Ordering::SeqCst) || self.fail_insert.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Degraded("failure injection active".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), StoaError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MemoryBackend for FlakyBackend {
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), StoaError> {
        Self::check(&self.fail_insert, "insert")?;
        self.inner.insert(entry).await
    }

    async fn search(
        &self,
        persona_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryEntry, f32)>, StoaError> {
        Self::check(&self.fail_search, "search")?;
        self.inner.search(persona_id, embedding, limit).await
    }

    async fn delete_persona(&self, persona_id: &str) -> Result<u64, StoaError> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete_persona(persona_id).await
    }

    async fn count(&self, persona_id: &str) -> Result<u64, StoaError> {
        self.inner.count(persona_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoa_memory::SqliteMemoryBackend;

    fn entry(id: &str) -> MemoryEntry {
        MemoryEntry {
            id: id.into(),
            persona_id: "plato".into(),
            content: "The forms are eternal.".into(),
            embedding: vec![1.0, 0.0],
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn failures_toggle_per_operation() {
        let inner = Arc::new(SqliteMemoryBackend::open_in_memory().await.unwrap());
        let backend = FlakyBackend::new(inner);

        backend.fail_insert(true);
        assert!(backend.insert(&entry("a")).await.is_err());
        assert_eq!(backend.count("plato").await.unwrap(), 0);

        backend.fail_insert(false);
        backend.insert(&entry("b")).await.unwrap();

        backend.fail_search(true);
        assert!(backend.search("plato", &[1.0, 0.0], 3).await.is_err());
        backend.fail_search(false);
        assert_eq!(backend.search("plato", &[1.0, 0.0], 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_reports_injection() {
        let inner = Arc::new(SqliteMemoryBackend::open_in_memory().await.unwrap());
        let backend = FlakyBackend::new(inner);
        assert_eq!(backend.health_check().await.unwrap(), HealthStatus::Healthy);
        backend.fail_search(true);
        assert!(matches!(
            backend.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
