//! Google Gemini generateContent client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiError, ChatMessage, ChatOptions, ChatRole, Provider, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
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
        // Gemini tags assistant turns as "model" and takes the system prompt
        // as a separate instruction object.
        let contents: Vec<Content> = messages.iter().filter(|m| m.role != ChatRole::System).map(Content::from).collect();

        let system_instruction = options
            .system_prompt
            .clone()
            .or_else(|| {
                messages
                    .iter()
                    .find(|m| m.role == ChatRole::System)
                    .map(|m| m.content.clone())
            })
            .map(|text| SystemInstruction {
                parts: vec![Part { text }],
            });

        let body = GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        };

        debug!(model, "sending generateContent request to gemini");

        let response = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|source| AiError::Http {
                provider: Provider::Gemini,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: Provider::Gemini,
                status: status.as_u16(),
                message,
            });
        }

        let completion: GenerateContentResponse = response.json().await.map_err(|source| AiError::Http {
            provider: Provider::Gemini,
            source,
        })?;

        let text = completion
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AiError::EmptyResponse {
                provider: Provider::Gemini,
            });
        }

        let usage = completion
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or(TokenUsage::new(0, 0));

        Ok((text, usage))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    parts: Vec<Part>,
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::Assistant => "model",
            _ => "user",
        };
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: message.content.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}
