//! Request/response models for the assistant endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::ai::assistant::AssistantRequest;
use crate::ai::{ChatMessage, Provider, TokenUsage};
use crate::store::models::{AssistantFeature, UsageLogEntry};
use crate::types::{ProjectId, UsageLogId, UserId};

/// Body for `POST /assistant/chat`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantChatRequest {
    /// Which assistant feature this call belongs to (recorded in the usage log)
    #[serde(default = "default_feature")]
    pub feature: AssistantFeature,
    /// Project the conversation concerns, if any
    #[schema(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    /// Provider override; the configured default applies when absent
    pub provider: Option<Provider>,
    /// Model override; the configured default applies when absent
    pub model: Option<String>,
    /// Ordered conversation turns
    pub messages: Vec<ChatMessage>,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Set false to bypass the response cache
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_feature() -> AssistantFeature {
    AssistantFeature::Chat
}

fn default_use_cache() -> bool {
    true
}

impl From<AssistantChatRequest> for AssistantRequest {
    fn from(api: AssistantChatRequest) -> Self {
        Self {
            feature: api.feature,
            project_id: api.project_id,
            provider: api.provider,
            model: api.model,
            messages: api.messages,
            system_prompt: api.system_prompt,
            temperature: api.temperature,
            max_tokens: api.max_tokens,
            use_cache: api.use_cache,
        }
    }
}

/// One usage-log entry as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageLogResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UsageLogId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    pub provider: Provider,
    pub model: String,
    pub feature: AssistantFeature,
    pub usage: TokenUsage,
    #[schema(value_type = f64)]
    pub estimated_cost: Decimal,
    pub latency_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UsageLogEntry> for UsageLogResponse {
    fn from(entry: UsageLogEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            project_id: entry.project_id,
            provider: entry.provider,
            model: entry.model,
            feature: entry.feature,
            usage: TokenUsage {
                prompt_tokens: entry.prompt_tokens,
                completion_tokens: entry.completion_tokens,
                total_tokens: entry.total_tokens,
            },
            estimated_cost: entry.estimated_cost,
            latency_ms: entry.latency_ms,
            success: entry.success,
            error_message: entry.error_message,
            created_at: entry.created_at,
        }
    }
}

/// Query parameters for listing usage-log entries
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsageQuery {
    /// Restrict to one project
    #[param(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
