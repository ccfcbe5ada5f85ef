// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use stoa_core::StoaError;
use stoa_core::traits::{PluginAdapter, ProviderAdapter};
use stoa_core::types::{AdapterType, AssembledContext, HealthStatus};

/// A mock provider that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every context passed to
/// `generate` is captured for assertions.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    contexts: Mutex<Vec<AssembledContext>>,
    latency: Option<Duration>,
    held: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl MockProvider {
    /// Create a new mock provider with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            contexts: Mutex::new(Vec::new()),
            latency: None,
            held: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Create a mock provider pre-loaded with the given replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::new()
        }
    }

    /// Sleep for `latency` before every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a reply to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a generation failure with `message`.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    /// Make subsequent calls block inside `generate` until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Lets one held call finish and stops holding new ones.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    /// Resolves once a held call has entered `generate`.
    pub async fn wait_until_generating(&self) {
        self.entered.notified().await;
    }

    /// Contexts received so far, oldest first.
    pub async fn contexts(&self) -> Vec<AssembledContext> {
        self.contexts.lock().await.clone()
    }

    /// The most recent context received.
    pub async fn last_context(&self) -> Option<AssembledContext> {
        self.contexts.lock().await.last().cloned()
    }

    pub async fn calls(&self) -> usize {
        self.contexts.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, StoaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(&self, context: &AssembledContext) -> Result<String, StoaError> {
        self.contexts.lock().await.push(context.clone());

        if self.held.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.replies.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(StoaError::generation(message)),
            None => Ok("mock response".to_string()),
        }
    }
}
