//! Anthropic messages API client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiError, ChatMessage, ChatOptions, ChatRole, Provider, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

// The messages API requires max_tokens; used when the caller sets none.
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Override the API base URL (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage], options: &ChatOptions) -> Result<(String, TokenUsage), AiError> {
        // The messages array only carries user/assistant turns; the system
        // prompt travels in its own top-level field.
        let wire_messages: Vec<WireMessage> = messages.iter().filter(|m| m.role != ChatRole::System).map(WireMessage::from).collect();

        let system = options.system_prompt.clone().or_else(|| {
            messages
                .iter()
                .find(|m| m.role == ChatRole::System)
                .map(|m| m.content.clone())
        });

        let body = MessagesRequest {
            model: model.to_string(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: wire_messages,
            system,
            temperature: options.temperature,
        };

        debug!(model, "sending messages request to anthropic");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| AiError::Http {
                provider: Provider::Anthropic,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: Provider::Anthropic,
                status: status.as_u16(),
                message,
            });
        }

        let completion: MessagesResponse = response.json().await.map_err(|source| AiError::Http {
            provider: Provider::Anthropic,
            source,
        })?;

        let text = completion
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(AiError::EmptyResponse {
                provider: Provider::Anthropic,
            });
        }

        let usage = TokenUsage::new(completion.usage.input_tokens, completion.usage.output_tokens);

        Ok((text, usage))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::Assistant => "assistant",
            _ => "user",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: i64,
    output_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_parses_content_blocks_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Split the epic "}, {"type": "text", "text": "into two stories."}],
                "usage": {"input_tokens": 18, "output_tokens": 9},
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
        let (text, usage) = client
            .chat("claude-3-5-haiku-latest", &[ChatMessage::user("split this epic")], &ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(text, "Split the epic into two stories.");
        assert_eq!(usage.prompt_tokens, 18);
        assert_eq!(usage.completion_tokens, 9);
    }

    #[tokio::test]
    async fn test_system_prompt_travels_as_top_level_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({
                "system": "You are a scrum assistant.",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "hi"}],
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
        let options = ChatOptions {
            system_prompt: Some("You are a scrum assistant.".to_string()),
            ..Default::default()
        };
        client
            .chat("claude-3-5-haiku-latest", &[ChatMessage::user("hello")], &options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
        let err = client
            .chat("claude-3-5-haiku-latest", &[ChatMessage::user("hello")], &ChatOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Api { status: 429, .. }));
    }
}
