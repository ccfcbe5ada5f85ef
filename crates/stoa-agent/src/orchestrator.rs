// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request pipeline: retrieve, assemble, generate, record.
//!
//! Each call to [`ResponseOrchestrator::respond_in`] walks a small state
//! machine (`received -> retrieving -> assembling -> generating -> recording
//! -> done`, with `failed` reachable from any non-terminal state).
//!
//! Long-term memory is best effort on both ends. A failed or slow retrieval
//! degrades to an empty context, and the commit of a finished exchange runs
//! detached from the caller. Generation failures are fatal and leave the
//! session untouched.
//!
//! Recording happens in a spawned task, so a caller that drops the response
//! future after generation can never leave a user turn without its reply.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use uuid::Uuid;

use stoa_config::StoaConfig;
use stoa_context::ContextAssembler;
use stoa_core::error::StoaError;
use stoa_core::traits::ProviderAdapter;
use stoa_core::types::{
    AssembledContext, MemoryEntry, NewMemoryEntry, PersonaDescriptor, RetrievedContext,
    SessionKey, Turn,
};
use stoa_memory::{LongTermMemoryStore, RetrievalEngine, summarize_exchange};

use crate::health::{MemoryDegradation, MemoryHealth};
use crate::persona::PersonaRegistry;
use crate::session::SessionStore;

/// Lifecycle of one respond request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Retrieving,
    Assembling,
    Generating,
    Recording,
    Done,
    Failed,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Received => write!(f, "received"),
            RequestState::Retrieving => write!(f, "retrieving"),
            RequestState::Assembling => write!(f, "assembling"),
            RequestState::Generating => write!(f, "generating"),
            RequestState::Recording => write!(f, "recording"),
            RequestState::Done => write!(f, "done"),
            RequestState::Failed => write!(f, "failed"),
        }
    }
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (Received, Retrieving)
            | (Retrieving, Assembling)
            | (Assembling, Generating)
            | (Generating, Recording)
            | (Recording, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

struct RequestFsm {
    request_id: Uuid,
    persona_id: String,
    state: RequestState,
}

impl RequestFsm {
    fn new(persona_id: &str) -> Self {
        let fsm = Self {
            request_id: Uuid::new_v4(),
            persona_id: persona_id.to_string(),
            state: RequestState::Received,
        };
        debug!(request_id = %fsm.request_id, persona_id, "request received");
        fsm
    }

    fn advance(&mut self, next: RequestState) -> Result<(), StoaError> {
        if !self.state.can_advance_to(next) {
            return Err(StoaError::Internal(format!(
                "illegal request transition {} -> {next}",
                self.state
            )));
        }
        debug!(
            request_id = %self.request_id,
            persona_id = %self.persona_id,
            from = %self.state,
            to = %next,
            "request state transition"
        );
        self.state = next;
        Ok(())
    }

    /// Moves to `failed` and hands back the error.
    fn fail(&mut self, err: StoaError) -> StoaError {
        if !self.state.is_terminal() {
            debug!(
                request_id = %self.request_id,
                persona_id = %self.persona_id,
                from = %self.state,
                error = %err,
                "request failed"
            );
            self.state = RequestState::Failed;
        }
        err
    }
}

/// Why a long-term commit did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The session was reset while the reply was generated.
    SessionReset,
    /// Long-term memory was reset while the reply was generated.
    MemoryReset,
    /// The orchestrator was shutting down.
    ShuttingDown,
}

/// Final result of the long-term commit for one exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(MemoryEntry),
    Skipped(SkipReason),
    Failed(String),
}

/// Resolves once the exchange's long-term commit has finished.
///
/// Dropping the handle does not cancel the commit.
#[derive(Debug)]
pub struct CommitHandle {
    rx: oneshot::Receiver<CommitOutcome>,
}

impl CommitHandle {
    fn ready(outcome: CommitOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    pub async fn wait(self) -> CommitOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| CommitOutcome::Failed("commit task ended without a result".into()))
    }
}

/// A successful response.
#[derive(Debug)]
pub struct Response {
    pub request_id: Uuid,
    pub text: String,
    /// True when long-term retrieval failed and the reply was generated without it.
    pub retrieval_degraded: bool,
    pub commit: CommitHandle,
}

/// Timeouts and limits of the pipeline.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_recent_turns: usize,
    pub max_entry_chars: usize,
    pub retrieval_timeout: Duration,
    pub generation_timeout: Duration,
    pub commit_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &StoaConfig) -> Self {
        Self {
            max_recent_turns: config.context.max_recent_turns,
            max_entry_chars: config.memory.max_entry_chars,
            retrieval_timeout: Duration::from_millis(config.memory.retrieval_timeout_ms),
            generation_timeout: Duration::from_secs(config.anthropic.timeout_secs),
            commit_timeout: Duration::from_millis(config.memory.commit_timeout_ms),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&StoaConfig::default())
    }
}

/// Collaborators wired into a [`ResponseOrchestrator`].
pub struct OrchestratorParts {
    pub registry: Arc<PersonaRegistry>,
    pub sessions: Arc<SessionStore>,
    pub memory: Arc<LongTermMemoryStore>,
    pub retrieval: Arc<RetrievalEngine>,
    pub assembler: ContextAssembler,
    pub provider: Arc<dyn ProviderAdapter>,
    pub health: Arc<MemoryHealth>,
}

/// Produces persona replies and records them in both memories.
pub struct ResponseOrchestrator {
    registry: Arc<PersonaRegistry>,
    sessions: Arc<SessionStore>,
    memory: Arc<LongTermMemoryStore>,
    retrieval: Arc<RetrievalEngine>,
    assembler: ContextAssembler,
    provider: Arc<dyn ProviderAdapter>,
    health: Arc<MemoryHealth>,
    settings: OrchestratorSettings,
    commits: TaskTracker,
}

impl ResponseOrchestrator {
    pub fn new(parts: OrchestratorParts, settings: OrchestratorSettings) -> Self {
        Self {
            registry: parts.registry,
            sessions: parts.sessions,
            memory: parts.memory,
            retrieval: parts.retrieval,
            assembler: parts.assembler,
            provider: parts.provider,
            health: parts.health,
            settings,
            commits: TaskTracker::new(),
        }
    }

    pub fn health(&self) -> &Arc<MemoryHealth> {
        &self.health
    }

    /// Number of long-term commits still running.
    pub fn pending_commits(&self) -> usize {
        self.commits.len()
    }

    /// Replies to `message` in the persona's default conversation.
    pub async fn respond(&self, persona_id: &str, message: &str) -> Result<String, StoaError> {
        self.respond_in(&SessionKey::persona(persona_id), message)
            .await
            .map(|response| response.text)
    }

    /// Replies to `message` in the conversation identified by `key`.
    ///
    /// Errors: [`StoaError::UnknownPersona`] before any side effect,
    /// [`StoaError::ContextTooLarge`] and [`StoaError::Generation`] with the
    /// session left unchanged.
    pub async fn respond_in(
        &self,
        key: &SessionKey,
        message: &str,
    ) -> Result<Response, StoaError> {
        let mut fsm = RequestFsm::new(&key.persona_id);

        let persona = match self.registry.get(&key.persona_id) {
            Ok(persona) => persona.clone(),
            Err(e) => return Err(fsm.fail(e)),
        };
        let session = self
            .sessions
            .get_or_create(key)
            .await
            .map_err(|e| fsm.fail(e))?;
        let memory_epoch = self.memory.epoch(&persona.id).await;

        fsm.advance(RequestState::Retrieving)?;
        let (retrieved, retrieval_degraded) = self.retrieve(&persona.id, message).await;

        fsm.advance(RequestState::Assembling)?;
        let start = session
            .turns
            .len()
            .saturating_sub(self.settings.max_recent_turns);
        let user_turn = Turn::user(message);
        let context = self
            .assembler
            .build(&persona, &session.turns[start..], user_turn.clone(), &retrieved)
            .map_err(|e| fsm.fail(e))?;

        fsm.advance(RequestState::Generating)?;
        let reply = self.generate(&context).await.map_err(|e| fsm.fail(e))?;

        fsm.advance(RequestState::Recording)?;
        let commit = self
            .record(
                key,
                &persona,
                Epochs {
                    session: session.epoch,
                    memory: memory_epoch,
                },
                user_turn,
                reply.clone(),
            )
            .await
            .map_err(|e| fsm.fail(e))?;

        fsm.advance(RequestState::Done)?;
        Ok(Response {
            request_id: fsm.request_id,
            text: reply,
            retrieval_degraded,
            commit,
        })
    }

    async fn retrieve(&self, persona_id: &str, message: &str) -> (RetrievedContext, bool) {
        let timeout = self.settings.retrieval_timeout;
        let reason = match tokio::time::timeout(timeout, self.retrieval.query(persona_id, message))
            .await
        {
            Ok(Ok(retrieved)) => {
                self.health.record_retrieval_ok();
                return (retrieved, false);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => StoaError::Timeout { duration: timeout }.to_string(),
        };

        warn!(
            persona_id,
            error = %reason,
            "memory retrieval failed, answering without long-term context (non-fatal)"
        );
        self.health.record(MemoryDegradation::RetrievalDegraded {
            persona_id: persona_id.to_string(),
            reason,
        });
        (RetrievedContext::empty(), true)
    }

    async fn generate(&self, context: &AssembledContext) -> Result<String, StoaError> {
        let timeout = self.settings.generation_timeout;
        match tokio::time::timeout(timeout, self.provider.generate(context)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e @ StoaError::Generation { .. })) => Err(e),
            Ok(Err(e)) => Err(StoaError::Generation {
                message: e.to_string(),
                source: Some(Box::new(e)),
            }),
            Err(_) => Err(StoaError::Generation {
                message: format!("no reply within {timeout:?}"),
                source: Some(Box::new(StoaError::Timeout { duration: timeout })),
            }),
        }
    }

    /// Appends the exchange to the session and starts the long-term commit.
    ///
    /// Runs on a spawned task so that it completes even if the caller is
    /// cancelled while awaiting it.
    async fn record(
        &self,
        key: &SessionKey,
        persona: &PersonaDescriptor,
        epochs: Epochs,
        user_turn: Turn,
        reply: String,
    ) -> Result<CommitHandle, StoaError> {
        let job = CommitJob {
            memory: self.memory.clone(),
            health: self.health.clone(),
            entry: NewMemoryEntry {
                persona_id: persona.id.clone(),
                content: summarize_exchange(
                    &persona.name,
                    &user_turn.content,
                    &reply,
                    self.settings.max_entry_chars,
                ),
            },
            epoch: epochs.memory,
            timeout: self.settings.commit_timeout,
        };
        let sessions = self.sessions.clone();
        let commits = self.commits.clone();
        let key = key.clone();

        let recording = tokio::spawn(async move {
            let applied = sessions
                .append_exchange(&key, user_turn, Turn::assistant(reply), epochs.session)
                .await?;
            if !applied {
                return Ok(CommitHandle::ready(CommitOutcome::Skipped(
                    SkipReason::SessionReset,
                )));
            }
            if commits.is_closed() {
                return Ok(CommitHandle::ready(CommitOutcome::Skipped(
                    SkipReason::ShuttingDown,
                )));
            }

            let (tx, rx) = oneshot::channel();
            commits.spawn(async move {
                let _ = tx.send(job.run().await);
            });
            Ok::<_, StoaError>(CommitHandle { rx })
        });

        recording
            .await
            .map_err(|e| StoaError::Internal(format!("recording task failed: {e}")))?
    }

    /// Stops accepting commits and waits for the running ones.
    pub async fn shutdown(&self) {
        self.commits.close();
        if !self.commits.is_empty() {
            debug!(pending = self.commits.len(), "waiting for memory commits");
        }
        self.commits.wait().await;
    }
}

#[derive(Debug, Clone, Copy)]
struct Epochs {
    session: u64,
    memory: u64,
}

struct CommitJob {
    memory: Arc<LongTermMemoryStore>,
    health: Arc<MemoryHealth>,
    entry: NewMemoryEntry,
    epoch: u64,
    timeout: Duration,
}

impl CommitJob {
    async fn run(self) -> CommitOutcome {
        let persona_id = self.entry.persona_id.clone();
        let commit = self.memory.commit_if_current(self.entry, self.epoch);
        let reason = match tokio::time::timeout(self.timeout, commit).await {
            Ok(Ok(Some(entry))) => {
                self.health.record_commit_ok();
                return CommitOutcome::Committed(entry);
            }
            Ok(Ok(None)) => return CommitOutcome::Skipped(SkipReason::MemoryReset),
            Ok(Err(e)) => e.to_string(),
            Err(_) => StoaError::Timeout {
                duration: self.timeout,
            }
            .to_string(),
        };

        warn!(
            persona_id = %persona_id,
            error = %reason,
            "failed to commit exchange to long-term memory (non-fatal)"
        );
        self.health.record(MemoryDegradation::CommitFailure {
            persona_id,
            reason: reason.clone(),
        });
        CommitOutcome::Failed(reason)
    }
}
