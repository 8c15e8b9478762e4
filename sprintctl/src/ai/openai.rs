//! OpenAI chat completions client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiError, ChatMessage, ChatOptions, ChatRole, Provider, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiClient {
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
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(system_prompt) = &options.system_prompt {
            wire_messages.push(WireMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }
        wire_messages.extend(messages.iter().map(WireMessage::from));

        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: wire_messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        debug!(model, "sending chat completion request to openai");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| AiError::Http {
                provider: Provider::Openai,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: Provider::Openai,
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|source| AiError::Http {
            provider: Provider::Openai,
            source,
        })?;

        let choice = completion.choices.into_iter().next().ok_or(AiError::EmptyResponse {
            provider: Provider::Openai,
        })?;

        let usage = completion
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or(TokenUsage::new(0, 0));

        Ok((choice.message.content, usage))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_parses_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Three story points."}}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("test-key".to_string()).with_base_url(server.uri());
        let (text, usage) = client
            .chat("gpt-4o", &[ChatMessage::user("estimate this story")], &ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(text, "Three story points.");
        assert_eq!(usage.prompt_tokens, 42);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 49);
    }

    #[tokio::test]
    async fn test_chat_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("bad-key".to_string()).with_base_url(server.uri());
        let err = client
            .chat("gpt-4o", &[ChatMessage::user("hello")], &ChatOptions::default())
            .await
            .unwrap_err();

        match err {
            AiError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_system_prompt_is_prepended() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "system", "content": "You are a scrum assistant."},
                    {"role": "user", "content": "plan the sprint"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("test-key".to_string()).with_base_url(server.uri());
        let options = ChatOptions {
            system_prompt: Some("You are a scrum assistant.".to_string()),
            ..Default::default()
        };
        client.chat("gpt-4o", &[ChatMessage::user("plan the sprint")], &options).await.unwrap();
    }
}
