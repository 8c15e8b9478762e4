//! AI provider layer.
//!
//! A single capability - `chat(model, messages, options)` returning response
//! text, a token usage breakdown, and an estimated cost - normalized across a
//! closed set of hosted providers. Provider selection and model validation
//! are configuration concerns handled by [`AiClients`]; each provider client
//! is a thin typed HTTP adapter.
//!
//! # Modules
//!
//! - [`openai`], [`anthropic`], [`gemini`]: provider HTTP clients
//! - [`pricing`]: per-model cost estimation
//! - [`assistant`]: the governed request flow (policy checks, rate limit,
//!   cache, provider call, usage ledger)

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::AiConfig;

pub mod anthropic;
pub mod assistant;
pub mod gemini;
pub mod openai;
pub mod pricing;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// The closed set of supported AI providers, stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Openai,
    Anthropic,
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Openai => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Role tag on a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat exchange
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request options common to all providers
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// System prompt, passed the way each provider expects it
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Token usage breakdown reported by a provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: i64, completion_tokens: i64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A completed chat call: response text, usage, and estimated cost
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub text: String,
    pub usage: TokenUsage,
    pub estimated_cost: rust_decimal::Decimal,
}

/// Errors from the AI provider layer
#[derive(Error, Debug)]
pub enum AiError {
    /// No API key configured for the requested provider
    #[error("provider {provider} is not configured")]
    NotConfigured { provider: Provider },

    /// Requested model is not on the provider's allow-list
    #[error("model {model} is not allowed for provider {provider}")]
    ModelNotAllowed { provider: Provider, model: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("{provider} request failed: {source}")]
    Http {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    /// Provider returned a non-success status
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// Provider returned a success status but no usable content
    #[error("empty response from {provider}")]
    EmptyResponse { provider: Provider },
}

/// A provider client dispatched through the closed [`Provider`] set.
///
/// The dispatch is a plain enum match rather than trait objects: the set of
/// providers is fixed and each arm differs only in wire format.
pub enum AiClient {
    Openai(OpenAiClient),
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
}

impl AiClient {
    pub fn provider(&self) -> Provider {
        match self {
            AiClient::Openai(_) => Provider::Openai,
            AiClient::Anthropic(_) => Provider::Anthropic,
            AiClient::Gemini(_) => Provider::Gemini,
        }
    }

    /// Execute a chat call and attach the estimated cost for the model.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatCompletion, AiError> {
        let (text, usage) = match self {
            AiClient::Openai(client) => client.chat(model, messages, options).await?,
            AiClient::Anthropic(client) => client.chat(model, messages, options).await?,
            AiClient::Gemini(client) => client.chat(model, messages, options).await?,
        };

        let estimated_cost = pricing::estimate_cost(self.provider(), model, &usage);

        Ok(ChatCompletion {
            text,
            usage,
            estimated_cost,
        })
    }
}

/// Registry of configured provider clients plus per-provider model
/// allow-lists.
#[derive(Default)]
pub struct AiClients {
    clients: HashMap<Provider, AiClient>,
    allowed_models: HashMap<Provider, Vec<String>>,
}

impl AiClients {
    /// Build clients for every provider with an API key in the configuration.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut clients = HashMap::new();
        let mut allowed_models = HashMap::new();

        if let Some(api_key) = &config.openai.api_key {
            let mut client = OpenAiClient::new(api_key.clone());
            if let Some(base_url) = &config.openai.base_url {
                client = client.with_base_url(base_url.clone());
            }
            clients.insert(Provider::Openai, AiClient::Openai(client));
            allowed_models.insert(Provider::Openai, config.openai.models.clone());
        }

        if let Some(api_key) = &config.anthropic.api_key {
            let mut client = AnthropicClient::new(api_key.clone());
            if let Some(base_url) = &config.anthropic.base_url {
                client = client.with_base_url(base_url.clone());
            }
            clients.insert(Provider::Anthropic, AiClient::Anthropic(client));
            allowed_models.insert(Provider::Anthropic, config.anthropic.models.clone());
        }

        if let Some(api_key) = &config.gemini.api_key {
            let mut client = GeminiClient::new(api_key.clone());
            if let Some(base_url) = &config.gemini.base_url {
                client = client.with_base_url(base_url.clone());
            }
            clients.insert(Provider::Gemini, AiClient::Gemini(client));
            allowed_models.insert(Provider::Gemini, config.gemini.models.clone());
        }

        Self { clients, allowed_models }
    }

    /// Look up the client for a provider.
    ///
    /// # Errors
    /// - `NotConfigured` if the provider has no API key
    pub fn client_for(&self, provider: Provider) -> Result<&AiClient, AiError> {
        self.clients.get(&provider).ok_or(AiError::NotConfigured { provider })
    }

    /// Validate a model name against the provider's allow-list. An empty
    /// allow-list accepts any model.
    pub fn check_model(&self, provider: Provider, model: &str) -> Result<(), AiError> {
        match self.allowed_models.get(&provider) {
            Some(models) if !models.is_empty() && !models.iter().any(|m| m == model) => Err(AiError::ModelNotAllowed {
                provider,
                model: model.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
