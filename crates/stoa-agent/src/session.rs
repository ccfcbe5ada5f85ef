// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term, in-process dialogue state keyed by persona and conversation.
//!
//! Each session sits behind its own async `RwLock`: writers to one key are
//! serialized, readers proceed concurrently, and different keys never
//! contend. Map guards are always released before a session lock is awaited.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use stoa_core::error::StoaError;
use stoa_core::types::{Session, SessionKey, Turn};

use crate::persona::PersonaRegistry;

type SessionSlot = Arc<RwLock<Session>>;

/// Keyed store of short-term sessions for the registered personas.
pub struct SessionStore {
    known: HashSet<String>,
    sessions: DashMap<SessionKey, SessionSlot>,
}

impl SessionStore {
    pub fn new<I, S>(persona_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: persona_ids.into_iter().map(Into::into).collect(),
            sessions: DashMap::new(),
        }
    }

    pub fn for_registry(registry: &PersonaRegistry) -> Self {
        Self::new(registry.ids())
    }

    fn check(&self, key: &SessionKey) -> Result<(), StoaError> {
        if self.known.contains(&key.persona_id) {
            Ok(())
        } else {
            Err(StoaError::unknown_persona(&key.persona_id))
        }
    }

    fn slot(&self, key: &SessionKey) -> SessionSlot {
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(Session::new(key.clone()))))
            .value()
            .clone()
    }

    fn existing(&self, key: &SessionKey) -> Option<SessionSlot> {
        self.sessions.get(key).map(|slot| slot.value().clone())
    }

    /// Snapshot of the session for `key`, creating an empty one if needed.
    pub async fn get_or_create(&self, key: &SessionKey) -> Result<Session, StoaError> {
        self.check(key)?;
        let slot = self.slot(key);
        let session = slot.read().await.clone();
        Ok(session)
    }

    /// Appends `turn` to the end of the session.
    pub async fn append(&self, key: &SessionKey, turn: Turn) -> Result<(), StoaError> {
        self.check(key)?;
        let slot = self.slot(key);
        slot.write().await.turns.push(turn);
        Ok(())
    }

    /// Appends a user turn and its reply together, or neither.
    ///
    /// The pair is applied only while the session epoch still equals
    /// `expected_epoch`, i.e. no clear happened since the caller read the
    /// session. Returns whether the exchange was applied.
    pub async fn append_exchange(
        &self,
        key: &SessionKey,
        user: Turn,
        assistant: Turn,
        expected_epoch: u64,
    ) -> Result<bool, StoaError> {
        self.check(key)?;
        let slot = self.slot(key);
        let mut session = slot.write().await;
        if session.epoch != expected_epoch {
            debug!(
                session = %key,
                expected = expected_epoch,
                current = session.epoch,
                "discarding exchange from before a reset"
            );
            return Ok(false);
        }
        session.turns.push(user);
        session.turns.push(assistant);
        Ok(true)
    }

    /// Empties the session and advances its epoch. Returns the turns discarded.
    ///
    /// A key without a session is a no-op.
    pub async fn clear(&self, key: &SessionKey) -> usize {
        match self.existing(key) {
            Some(slot) => clear_slot(&slot).await,
            None => 0,
        }
    }

    /// Clears every conversation of `persona_id`. Returns the turns discarded.
    pub async fn clear_persona(&self, persona_id: &str) -> usize {
        let slots: Vec<SessionSlot> = self
            .sessions
            .iter()
            .filter(|entry| entry.key().persona_id == persona_id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut cleared = 0;
        for slot in &slots {
            cleared += clear_slot(slot).await;
        }
        cleared
    }

    /// The last `max_turns` turns of the session in original order.
    ///
    /// Non-destructive; empty when the session does not exist.
    pub async fn recent(&self, key: &SessionKey, max_turns: usize) -> Vec<Turn> {
        let Some(slot) = self.existing(key) else {
            return Vec::new();
        };
        let session = slot.read().await;
        let start = session.turns.len().saturating_sub(max_turns);
        session.turns[start..].to_vec()
    }

    /// Clear epoch of the session; 0 for a session never cleared or created.
    pub async fn epoch(&self, key: &SessionKey) -> u64 {
        match self.existing(key) {
            Some(slot) => slot.read().await.epoch,
            None => 0,
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

async fn clear_slot(slot: &SessionSlot) -> usize {
    let mut session = slot.write().await;
    let cleared = session.turns.len();
    session.turns.clear();
    session.epoch += 1;
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store() -> SessionStore {
        SessionStore::new(["socrates", "plato"])
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = store();
        let key = SessionKey::persona("socrates");
        let first = store.get_or_create(&key).await.unwrap();
        let second = store.get_or_create(&key).await.unwrap();
        assert_eq!(first, second);
        assert!(first.turns.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_persona_rejected() {
        let store = store();
        let key = SessionKey::persona("kant");
        assert!(matches!(
            store.get_or_create(&key).await,
            Err(StoaError::UnknownPersona { .. })
        ));
        assert!(store.append(&key, Turn::user("hi")).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn recent_returns_tail_in_order() {
        let store = store();
        let key = SessionKey::persona("plato");
        for i in 0..5 {
            store.append(&key, Turn::user(format!("turn {i}"))).await.unwrap();
        }
        let recent = store.recent(&key, 2).await;
        let contents: Vec<_> = recent.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["turn 3", "turn 4"]);
        // Non-destructive.
        assert_eq!(store.recent(&key, 10).await.len(), 5);
    }

    #[tokio::test]
    async fn recent_of_missing_session_is_empty() {
        let store = store();
        assert!(store.recent(&SessionKey::persona("plato"), 3).await.is_empty());
    }

    #[tokio::test]
    async fn clear_empties_and_bumps_epoch() {
        let store = store();
        let key = SessionKey::persona("socrates");
        store.append(&key, Turn::user("a")).await.unwrap();
        store.append(&key, Turn::assistant("b")).await.unwrap();
        assert_eq!(store.clear(&key).await, 2);
        assert!(store.recent(&key, 10).await.is_empty());
        assert_eq!(store.epoch(&key).await, 1);
    }

    #[tokio::test]
    async fn clear_of_missing_session_is_a_noop() {
        let store = store();
        assert_eq!(store.clear(&SessionKey::persona("socrates")).await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clear_persona_clears_all_its_conversations_only() {
        let store = store();
        let a = SessionKey::new("socrates", "alice");
        let b = SessionKey::new("socrates", "bob");
        let other = SessionKey::new("plato", "alice");
        for key in [&a, &b, &other] {
            store.append(key, Turn::user("hello")).await.unwrap();
        }
        assert_eq!(store.clear_persona("socrates").await, 2);
        assert!(store.recent(&a, 10).await.is_empty());
        assert!(store.recent(&b, 10).await.is_empty());
        assert_eq!(store.recent(&other, 10).await.len(), 1);
    }

    #[tokio::test]
    async fn stale_exchange_is_rejected_after_clear() {
        let store = store();
        let key = SessionKey::persona("socrates");
        let session = store.get_or_create(&key).await.unwrap();
        store.append(&key, Turn::user("before reset")).await.unwrap();
        store.clear(&key).await;

        let applied = store
            .append_exchange(&key, Turn::user("q"), Turn::assistant("a"), session.epoch)
            .await
            .unwrap();
        assert!(!applied);
        assert!(store.recent(&key, 10).await.is_empty());

        let epoch = store.epoch(&key).await;
        let applied = store
            .append_exchange(&key, Turn::user("q"), Turn::assistant("a"), epoch)
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(store.recent(&key, 10).await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_exchanges_never_interleave() {
        let store = Arc::new(store());
        let key = SessionKey::persona("plato");
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .append_exchange(
                        &key,
                        Turn::user(format!("q{i}")),
                        Turn::assistant(format!("a{i}")),
                        0,
                    )
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }

        let turns = store.recent(&key, usize::MAX).await;
        assert_eq!(turns.len(), 32);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    proptest! {
        #[test]
        fn recent_is_exact_suffix(n in 0usize..30, k in 0usize..40) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = store();
                let key = SessionKey::persona("socrates");
                for i in 0..n {
                    store.append(&key, Turn::user(i.to_string())).await.unwrap();
                }
                let recent = store.recent(&key, k).await;
                let expected: Vec<String> = (n.saturating_sub(k)..n).map(|i| i.to_string()).collect();
                let got: Vec<String> = recent.into_iter().map(|t| t.content).collect();
                assert_eq!(got, expected);
            });
        }
    }
}
