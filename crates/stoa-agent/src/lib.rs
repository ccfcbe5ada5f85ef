// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona sessions and response orchestration for Stoa.
//!
//! The [`AgentRuntime`] is the central coordinator that:
//! - Looks up personas in the fixed [`PersonaRegistry`]
//! - Keeps short-term dialogue per persona and conversation
//! - Retrieves relevant long-term memories and assembles the context
//! - Calls the generation provider and records the exchange
//! - Resets either memory on request

pub mod health;
pub mod orchestrator;
pub mod persona;
pub mod reset;
pub mod runtime;
pub mod session;

pub use health::{MemoryDegradation, MemoryHealth, MemoryHealthSnapshot};
pub use orchestrator::{
    CommitHandle, CommitOutcome, OrchestratorParts, OrchestratorSettings, RequestState, Response,
    ResponseOrchestrator, SkipReason,
};
pub use persona::PersonaRegistry;
pub use reset::{ResetController, ResetReport};
pub use runtime::AgentRuntime;
pub use session::SessionStore;
