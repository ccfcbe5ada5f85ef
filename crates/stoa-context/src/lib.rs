// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly for Stoa.
//!
//! Combines a persona, the recent session turns, the newest user message and
//! retrieved long-term memory into an [`AssembledContext`] that never exceeds
//! the configured size ceiling.

pub mod assembler;
pub mod digest;

pub use assembler::ContextAssembler;
pub use digest::{DIGEST_HEADING, render_digest};
pub use stoa_core::types::AssembledContext;
