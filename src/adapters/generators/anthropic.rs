//! Anthropic Messages API generator.
//!
//! Each [`GenerationRequest`] becomes one non-streaming `/v1/messages` call.
//! The task role and the expected JSON shape go into the system prompt; the
//! request itself is sent as the user message, serialized as JSON.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::GeneratorConfig;
use crate::domain::ports::{GenerationRequest, Generator};

/// Message role in the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Content block in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    /// Any block kind this client does not use.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

/// Body of a `/v1/messages` call.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// Generator backed by the Anthropic HTTP API.
pub struct AnthropicGenerator {
    config: GeneratorConfig,
    client: Client,
}

impl AnthropicGenerator {
    pub fn new(config: GeneratorConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::GeneratorFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    fn build_request(&self, request: &GenerationRequest) -> DomainResult<MessagesRequest> {
        let system = format!(
            "{}\nRespond with a single JSON object of the shape {} and nothing else.",
            request.role,
            request.task.response_schema()
        );
        let payload = serde_json::to_string_pretty(request)?;

        Ok(MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text { text: payload }],
            }],
        })
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn generate(&self, request: GenerationRequest) -> DomainResult<String> {
        let api_key = self
            .config
            .resolve_api_key()
            .ok_or_else(|| DomainError::GeneratorFailed("ANTHROPIC_API_KEY not set".to_string()))?;

        let body = self.build_request(&request)?;
        tracing::debug!(
            generator = self.name(),
            task = %request.task,
            model = %body.model,
            file = %request.file_path,
            "Sending generation request"
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::GeneratorFailed(format!("API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DomainError::GeneratorFailed(format!(
                "API error {status}: {text}"
            )));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::GeneratorFailed(format!("Failed to parse response: {e}")))?;

        tracing::debug!(
            generator = self.name(),
            task = %request.task,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            stop_reason = ?result.stop_reason,
            "Generation complete"
        );

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(DomainError::GeneratorFailed(
                "Response contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EnrichedContext;
    use crate::domain::ports::GenerationTask;
    use std::sync::Arc;

    #[test]
    fn build_request_carries_role_and_schema() {
        let generator = AnthropicGenerator::new(GeneratorConfig::default()).unwrap();
        let request = GenerationRequest::new(
            GenerationTask::FixLint,
            "Button.test.tsx",
            "old",
            Arc::new(EnrichedContext::named("Button")),
        );

        let body = generator.build_request(&request).unwrap();
        assert_eq!(body.model, GeneratorConfig::default().model);
        assert!(body.system.starts_with(GenerationTask::FixLint.role()));
        assert!(body.system.contains("\"explanation\""));

        let ContentBlock::Text { text } = &body.messages[0].content[0] else {
            panic!("expected text block");
        };
        let payload: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["task"], "fix_lint");
    }

    #[test]
    fn unknown_content_blocks_are_tolerated() {
        let json = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"{}"}],
                      "usage":{"input_tokens":1,"output_tokens":2}}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert!(matches!(parsed.content[0], ContentBlock::Other));
    }
}
