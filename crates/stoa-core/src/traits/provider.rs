// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the generation collaborator.

use async_trait::async_trait;

use crate::error::StoaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::AssembledContext;

/// Adapter for the language model that speaks as a persona.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Generates the persona's reply for an assembled context.
    ///
    /// The context is consumed by exactly one call. Implementations must not
    /// retain it.
    async fn generate(&self, context: &AssembledContext) -> Result<String, StoaError>;
}
