// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory backend with embeddings stored as BLOBs.
//!
//! Similarity search is an in-process cosine scan over one persona's rows.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use stoa_core::error::StoaError;
use stoa_core::traits::{MemoryBackend, PluginAdapter};
use stoa_core::types::{AdapterType, HealthStatus, MemoryEntry};

use crate::vector::{blob_to_vec, cosine_similarity, rank, vec_to_blob};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Helper to convert tokio_rusqlite errors into StoaError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> StoaError {
    StoaError::Storage {
        source: Box::new(e),
    }
}

/// Applies pending schema migrations on a raw connection.
fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), StoaError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| StoaError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}

/// Persistent memory backend over a single SQLite database.
pub struct SqliteMemoryBackend {
    conn: Connection,
}

impl SqliteMemoryBackend {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, StoaError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoaError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(|e| StoaError::Storage {
            source: Box::new(e),
        })?;
        let backend = Self::with_connection(conn, wal_mode).await?;
        debug!(path = %path.display(), "memory database opened");
        Ok(backend)
    }

    /// Opens a private in-memory database, used by tests and ephemeral runs.
    pub async fn open_in_memory() -> Result<Self, StoaError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoaError::Storage {
                source: Box::new(e),
            })?;
        Self::with_connection(conn, false).await
    }

    async fn with_connection(conn: Connection, wal_mode: bool) -> Result<Self, StoaError> {
        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(run_migrations(conn))
        })
        .await
        .map_err(storage_err)??;
        Ok(Self { conn })
    }
}

#[async_trait]
impl PluginAdapter for SqliteMemoryBackend {
    fn name(&self) -> &str {
        "sqlite-memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MemoryBackend
    }

    async fn health_check(&self) -> Result<HealthStatus, StoaError> {
        let probe = self
            .conn
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await;
        Ok(match probe {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("memory database unreachable: {e}")),
        })
    }

    async fn shutdown(&self) -> Result<(), StoaError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA optimize;")?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }
}

#[async_trait]
impl MemoryBackend for SqliteMemoryBackend {
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), StoaError> {
        let id = entry.id.clone();
        let persona_id = entry.persona_id.clone();
        let content = entry.content.clone();
        let embedding_blob = vec_to_blob(&entry.embedding);
        let created_at = entry.created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memory_entries (id, persona_id, content, embedding, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, persona_id, content, embedding_blob, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn search(
        &self,
        persona_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryEntry, f32)>, StoaError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let persona_id = persona_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, persona_id, content, embedding, created_at FROM memory_entries WHERE persona_id = ?1",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![persona_id], |row| {
                        Ok(RawRow {
                            id: row.get(0)?,
                            persona_id: row.get(1)?,
                            content: row.get(2)?,
                            embedding: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(storage_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = row.into_entry()?;
            match cosine_similarity(embedding, &entry.embedding) {
                Some(score) => scored.push((entry, score)),
                None => warn!(
                    entry_id = %entry.id,
                    "skipping memory entry with mismatched embedding dimension"
                ),
            }
        }

        rank(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_persona(&self, persona_id: &str) -> Result<u64, StoaError> {
        let persona_id = persona_id.to_string();
        self.conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM memory_entries WHERE persona_id = ?1",
                    rusqlite::params![persona_id],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(storage_err)
    }

    async fn count(&self, persona_id: &str) -> Result<u64, StoaError> {
        let persona_id = persona_id.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM memory_entries WHERE persona_id = ?1",
                    rusqlite::params![persona_id],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(storage_err)
    }
}

/// A row as read from SQLite, before timestamp parsing.
struct RawRow {
    id: String,
    persona_id: String,
    content: String,
    embedding: Vec<u8>,
    created_at: String,
}

impl RawRow {
    fn into_entry(self) -> Result<MemoryEntry, StoaError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoaError::Storage {
                source: Box::new(e),
            })?
            .with_timezone(&Utc);
        Ok(MemoryEntry {
            id: self.id,
            persona_id: self.persona_id,
            content: self.content,
            embedding: blob_to_vec(&self.embedding),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_entry(id: &str, persona_id: &str, embedding: Vec<f32>) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            persona_id: persona_id.to_string(),
            content: format!("memory {id}"),
            embedding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_count() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        backend
            .insert(&make_entry("m1", "socrates", vec![1.0, 0.0]))
            .await
            .unwrap();
        backend
            .insert(&make_entry("m2", "socrates", vec![0.0, 1.0]))
            .await
            .unwrap();
        assert_eq!(backend.count("socrates").await.unwrap(), 2);
        assert_eq!(backend.count("plato").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        backend
            .insert(&make_entry("far", "socrates", vec![0.0, 1.0]))
            .await
            .unwrap();
        backend
            .insert(&make_entry("near", "socrates", vec![1.0, 0.1]))
            .await
            .unwrap();

        let results = backend.search("socrates", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "near");
        assert!(results[0].1 > results[1].1);
    }

    #[tokio::test]
    async fn search_is_scoped_to_persona() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        backend
            .insert(&make_entry("d1", "descartes", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = backend.search("turing", &[1.0, 0.0], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_respects_limit_and_recency_ties() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        let mut older = make_entry("older", "plato", vec![1.0, 0.0]);
        older.created_at = Utc::now() - Duration::hours(1);
        backend.insert(&older).await.unwrap();
        backend
            .insert(&make_entry("newer", "plato", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = backend.search("plato", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "newer");
    }

    #[tokio::test]
    async fn search_skips_mismatched_dimensions() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        backend
            .insert(&make_entry("short", "plato", vec![1.0]))
            .await
            .unwrap();
        backend
            .insert(&make_entry("ok", "plato", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = backend.search("plato", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "ok");
    }

    #[tokio::test]
    async fn delete_persona_removes_only_that_persona() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        for i in 0..3 {
            backend
                .insert(&make_entry(&format!("a{i}"), "aristotle", vec![1.0, 0.0]))
                .await
                .unwrap();
        }
        backend
            .insert(&make_entry("p1", "plato", vec![1.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(backend.delete_persona("aristotle").await.unwrap(), 3);
        assert_eq!(backend.count("aristotle").await.unwrap(), 0);
        assert_eq!(backend.count("plato").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn timestamps_round_trip_with_full_precision() {
        let backend = SqliteMemoryBackend::open_in_memory().await.unwrap();
        let entry = make_entry("t", "leibniz", vec![0.5, 0.5]);
        backend.insert(&entry).await.unwrap();
        let results = backend.search("leibniz", &[0.5, 0.5], 1).await.unwrap();
        assert_eq!(results[0].0.created_at, entry.created_at);
        assert_eq!(results[0].0.embedding, entry.embedding);
    }

    #[tokio::test]
    async fn on_disk_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.db");

        let backend = SqliteMemoryBackend::open(&path, true).await.unwrap();
        backend
            .insert(&make_entry("kept", "searle", vec![1.0, 0.0]))
            .await
            .unwrap();
        drop(backend);

        let reopened = SqliteMemoryBackend::open(&path, true).await.unwrap();
        assert_eq!(reopened.count("searle").await.unwrap(), 1);
        assert_eq!(
            reopened.health_check().await.unwrap(),
            HealthStatus::Healthy
        );
    }
}
