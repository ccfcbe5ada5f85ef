// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider for Stoa personas.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages API.
//! The persona and its retrieved memories travel in the system prompt; the
//! recent turns become the message list.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use stoa_config::AnthropicConfig;
use stoa_core::error::StoaError;
use stoa_core::traits::{PluginAdapter, ProviderAdapter};
use stoa_core::types::{AdapterType, AssembledContext, HealthStatus, PersonaDescriptor, Role};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider from the given configuration.
    pub fn new(config: &AnthropicConfig) -> Result<Self, StoaError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = AnthropicClient::new(
            &api_key,
            &config.api_version,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(model = config.default_model, "Anthropic provider initialized");

        Ok(Self {
            client,
            model: config.default_model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Creates a provider with an existing client (for testing).
    #[cfg(test)]
    fn with_client(client: AnthropicClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_tokens: 256,
        }
    }

    /// Converts an [`AssembledContext`] to an Anthropic [`MessageRequest`].
    fn to_message_request(&self, context: &AssembledContext) -> Result<MessageRequest, StoaError> {
        let messages = to_api_messages(context);
        if messages.is_empty() {
            return Err(StoaError::generation("context holds no user message"));
        }

        Ok(MessageRequest {
            model: self.model.clone(),
            messages,
            system: Some(system_prompt(&context.persona, &context.retrieved_summary)),
            max_tokens: self.max_tokens,
        })
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, StoaError> {
        // No API call: health checks must not consume tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoaError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn generate(&self, context: &AssembledContext) -> Result<String, StoaError> {
        let request = self.to_message_request(context)?;
        let response = self.client.complete_message(&request).await?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(StoaError::generation(format!(
                "empty reply (stop reason: {})",
                response.stop_reason.as_deref().unwrap_or("none")
            )));
        }
        debug!(
            persona_id = %context.persona.id,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "reply generated"
        );
        Ok(text)
    }
}

/// The system prompt for `persona`, followed by the retrieved digest.
pub fn system_prompt(persona: &PersonaDescriptor, digest: &str) -> String {
    let mut prompt = format!("You are {}.", persona.name);
    if !persona.perspective.trim().is_empty() {
        prompt.push(' ');
        prompt.push_str(persona.perspective.trim());
    }
    if !persona.style.trim().is_empty() {
        prompt.push_str("\n\nSpeaking style: ");
        prompt.push_str(persona.style.trim());
    }
    prompt.push_str(&format!(
        "\n\nStay in character as {} for the whole conversation.",
        persona.name
    ));
    if !digest.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(digest.trim_end());
    }
    prompt
}

/// Recent turns as Messages API messages.
///
/// The API requires the list to open with `user` and alternate, so leading
/// assistant turns are dropped and consecutive same-role turns are joined.
fn to_api_messages(context: &AssembledContext) -> Vec<ApiMessage> {
    let mut messages: Vec<ApiMessage> = Vec::with_capacity(context.recent_turns.len());
    let turns = context
        .recent_turns
        .iter()
        .skip_while(|turn| turn.role == Role::Assistant);

    for turn in turns {
        let role = turn.role.to_string();
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&turn.content);
            }
            _ => messages.push(ApiMessage {
                role,
                content: turn.content.clone(),
            }),
        }
    }
    messages
}

/// Resolves the API key from config or the `ANTHROPIC_API_KEY` environment variable.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, StoaError> {
    pick_api_key(config_key, std::env::var("ANTHROPIC_API_KEY").ok())
}

fn pick_api_key(config_key: &Option<String>, env_key: Option<String>) -> Result<String, StoaError> {
    config_key
        .iter()
        .chain(env_key.iter())
        .find(|key| !key.trim().is_empty())
        .cloned()
        .ok_or_else(|| {
            StoaError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
            )
        })
}
