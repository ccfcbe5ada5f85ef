// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Stoa integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted generation provider with failure and gating
//! - [`FlakyBackend`] - Memory backend wrapper with switchable failures
//! - [`TestHarness`] - Fully wired runtime over a temp SQLite database

pub mod flaky_backend;
pub mod harness;
pub mod mock_provider;

pub use flaky_backend::FlakyBackend;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::MockProvider;
