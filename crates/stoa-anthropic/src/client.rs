// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin `reqwest` wrapper around `POST /v1/messages`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use stoa_core::StoaError;

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Outcome of a single HTTP attempt.
enum Attempt {
    Done(MessageResponse),
    Transient(StoaError),
    Fatal(StoaError),
}

/// Authenticated Messages API client.
///
/// Rate limiting and overload responses (429, 500, 503, 529) are retried
/// after `retry_delay`, up to `max_retries` extra attempts.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl AnthropicClient {
    /// Builds a client sending `api_key` and `api_version` with every request.
    pub fn new(api_key: &str, api_version: &str, timeout: Duration) -> Result<Self, StoaError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", header_value("API key", api_key)?);
        headers.insert("anthropic-version", header_value("API version", api_version)?);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| generation_err("could not build HTTP client", e))?;

        Ok(Self {
            http,
            endpoint: MESSAGES_URL.to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.endpoint = url;
        self
    }

    #[cfg(test)]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends `request`, retrying transient failures.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, StoaError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Transient(err) if attempt >= self.max_retries => return Err(err),
                Attempt::Transient(err) => {
                    attempt += 1;
                    warn!(attempt, error = %err, "transient Messages API error, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn send_once(&self, request: &MessageRequest) -> Result<Attempt, StoaError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| generation_err("request to Messages API failed", e))?;

        let status = response.status();
        debug!(%status, "Messages API responded");
        let body = response
            .text()
            .await
            .map_err(|e| generation_err("could not read Messages API body", e))?;

        if status.is_success() {
            let parsed = serde_json::from_str(&body)
                .map_err(|e| generation_err("malformed Messages API response", e))?;
            return Ok(Attempt::Done(parsed));
        }

        let err = StoaError::generation(api_error_message(status, &body));
        Ok(if is_transient(status) {
            Attempt::Transient(err)
        } else {
            Attempt::Fatal(err)
        })
    }
}

fn header_value(what: &str, value: &str) -> Result<HeaderValue, StoaError> {
    HeaderValue::from_str(value).map_err(|e| StoaError::Config(format!("invalid {what}: {e}")))
}

fn generation_err(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> StoaError {
    StoaError::Generation {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Prefers the structured `{"error": {...}}` body over the raw text.
fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api) => format!("Anthropic API error {status} ({}): {}", api.error.type_, api.error.message),
        Err(_) => format!("Anthropic API error {status}: {body}"),
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new("sk-stoa-test", "2023-06-01", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
            .with_retry_delay(Duration::from_millis(10))
    }

    fn virtue_request() -> MessageRequest {
        MessageRequest {
            model: "claude-test".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Can virtue be taught?".into(),
            }],
            system: Some("You are Plato.".into()),
            max_tokens: 128,
        }
    }

    fn reply(id: &str, text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "content": [{"type": "text", "text": text}],
            "model": "claude-test",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        }))
    }

    fn api_error(status: u16, kind: &str) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": kind, "message": "try later"}
        }))
    }

    #[tokio::test]
    async fn sends_system_prompt_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"system": "You are Plato."})))
            .respond_with(reply("msg_1", "Only by recollection."))
            .mount(&server)
            .await;

        let response = client_for(&server).complete_message(&virtue_request()).await.unwrap();
        assert_eq!(response.id, "msg_1");
        assert_eq!(response.text(), "Only by recollection.");
        assert_eq!(response.usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(api_error(429, "rate_limit_error"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("msg_2", "Patience."))
            .mount(&server)
            .await;

        let response = client_for(&server).complete_message(&virtue_request()).await.unwrap();
        assert_eq!(response.id, "msg_2");
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(api_error(400, "invalid_request_error"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete_message(&virtue_request())
            .await
            .unwrap_err();
        assert!(matches!(err, StoaError::Generation { .. }));
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn overload_gives_up_after_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(api_error(529, "overloaded_error"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete_message(&virtue_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overloaded_error"), "got: {err}");
    }

    #[tokio::test]
    async fn unstructured_error_body_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete_message(&virtue_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("forbidden"), "got: {err}");
    }

    #[tokio::test]
    async fn auth_and_version_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "sk-stoa-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(reply("msg_3", "ok"))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).complete_message(&virtue_request()).await.unwrap();
    }
}
