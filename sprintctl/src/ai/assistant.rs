//! The governed assistant request flow.
//!
//! One call path stitches the governance pieces together, in the same order
//! the product flow runs them: policy checks first (feature toggles, provider
//! configuration, model allow-list), then the rate-limit check, then the
//! response cache, and only then the paid provider call. Every provider
//! attempt - success or failure - lands in the append-only usage log.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use super::{AiClients, ChatMessage, ChatOptions, Provider, TokenUsage};
use crate::config::AiConfig;
use crate::errors::{Error, Result};
use crate::metrics::AiMetrics;
use crate::store::models::{AssistantFeature, UsageLogCreateRequest};
use crate::store::Store;
use crate::types::{ProjectId, UserId};
use crate::usage::{self, cache, RateLimitStatus};

/// A chat request as the service layer sees it
#[derive(Debug, Clone)]
pub struct AssistantRequest {
    pub feature: AssistantFeature,
    pub project_id: Option<ProjectId>,
    /// Defaults to the configured provider when absent
    pub provider: Option<Provider>,
    /// Defaults to the configured model when absent
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Callers can opt out of the cache for prompts that must be fresh
    pub use_cache: bool,
}

/// The assistant's answer plus the governance context it was produced under
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantReply {
    pub text: String,
    pub provider: Provider,
    pub model: String,
    pub usage: TokenUsage,
    /// Estimated spend for this call; zero when served from cache
    #[schema(value_type = f64)]
    pub estimated_cost: Decimal,
    /// Whether the response came from the cache instead of the provider
    pub cached: bool,
    /// Quota state after this request
    pub rate_limit: RateLimitStatus,
}

fn feature_name(feature: AssistantFeature) -> &'static str {
    match feature {
        AssistantFeature::StoryDraft => "story_draft",
        AssistantFeature::AcceptanceCriteria => "acceptance_criteria",
        AssistantFeature::SprintPlanning => "sprint_planning",
        AssistantFeature::BacklogPriority => "backlog_priority",
        AssistantFeature::Chat => "chat",
    }
}

/// Flatten the conversation into the text the cache key is derived from.
/// Role tags are included so a prompt repeated as a different role misses.
fn cache_key_text(request: &AssistantRequest) -> String {
    let mut parts = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system_prompt) = &request.system_prompt {
        parts.push(format!("system:{system_prompt}"));
    }
    for message in &request.messages {
        parts.push(format!("{:?}:{}", message.role, message.content));
    }
    parts.join("\n")
}

/// Run one assistant request through the full governance pipeline.
#[instrument(skip_all, fields(user = %crate::types::abbrev_uuid(&user_id), feature = feature_name(request.feature)))]
pub async fn run_chat(
    store: &dyn Store,
    clients: &AiClients,
    config: &AiConfig,
    metrics: Option<&AiMetrics>,
    user_id: UserId,
    request: AssistantRequest,
) -> Result<AssistantReply> {
    // Policy gates come first: they are free and fail fast.
    if !config.enabled {
        return Err(Error::FeatureDisabled {
            feature: "assistant".to_string(),
        });
    }
    if config.disabled_features.contains(&request.feature) {
        return Err(Error::FeatureDisabled {
            feature: feature_name(request.feature).to_string(),
        });
    }
    if request.messages.is_empty() {
        return Err(Error::BadRequest {
            message: "At least one message is required".to_string(),
        });
    }

    let provider = request.provider.unwrap_or(config.default_provider);
    let model = request.model.clone().unwrap_or_else(|| config.default_model.clone());

    let client = clients.client_for(provider)?;
    clients.check_model(provider, &model)?;

    // Soft cap: this check and the later increment are separate store
    // operations, so concurrent requests can race past it. See crate::usage.
    let status = usage::check_rate_limit(store, user_id, config.daily_request_limit).await?;
    if !status.allowed {
        if let Some(metrics) = metrics {
            metrics.record_outcome(provider, &model, "rate_limited");
        }
        return Err(Error::TooManyRequests {
            message: format!("Daily AI request limit of {} reached. Quota resets at midnight UTC.", status.limit),
        });
    }

    let prompt_text = cache_key_text(&request);

    // A fresh cache hit costs nothing: no provider call, no quota, no log entry.
    if config.cache.enabled && request.use_cache {
        if let Some(entry) = cache::get_cached_response(store, &prompt_text, provider, &model).await? {
            if let Some(metrics) = metrics {
                metrics.record_outcome(provider, &model, "cache_hit");
            }
            return Ok(AssistantReply {
                text: entry.response_text,
                provider,
                model,
                usage: TokenUsage::new(0, entry.token_count),
                estimated_cost: Decimal::ZERO,
                cached: true,
                rate_limit: status,
            });
        }
    }

    let options = ChatOptions {
        system_prompt: request.system_prompt.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let started = Instant::now();
    let outcome = client.chat(&model, &request.messages, &options).await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let completion = match outcome {
        Ok(completion) => completion,
        Err(ai_err) => {
            // Failed attempts still go on the audit trail; a log-write failure
            // must not mask the provider error the caller needs to see.
            let log_entry = UsageLogCreateRequest {
                user_id,
                project_id: request.project_id,
                provider,
                model: model.clone(),
                feature: request.feature,
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
                estimated_cost: Decimal::ZERO,
                latency_ms,
                success: false,
                error_message: Some(ai_err.to_string()),
            };
            if let Err(log_err) = store.append_usage_log(&log_entry).await {
                error!("Failed to record failed AI attempt in usage log: {log_err:#}");
            }
            if let Some(metrics) = metrics {
                metrics.record_outcome(provider, &model, "error");
            }
            return Err(ai_err.into());
        }
    };

    if config.cache.enabled {
        let ttl = chrono::Duration::hours(config.cache.ttl_hours);
        if let Err(cache_err) = cache::cache_response(
            store,
            &prompt_text,
            provider,
            &model,
            &completion.text,
            completion.usage.total_tokens,
            ttl,
        )
        .await
        {
            // The cache is correctness-optional; a failed write only costs a
            // future provider call.
            warn!("Failed to cache AI response: {cache_err:#}");
        }
    }

    if let Err(counter_err) = usage::record_usage(store, user_id).await {
        error!("Failed to increment usage counter: {counter_err:#}");
    }

    let log_entry = UsageLogCreateRequest {
        user_id,
        project_id: request.project_id,
        provider,
        model: model.clone(),
        feature: request.feature,
        prompt_tokens: completion.usage.prompt_tokens,
        completion_tokens: completion.usage.completion_tokens,
        total_tokens: completion.usage.total_tokens,
        estimated_cost: completion.estimated_cost,
        latency_ms,
        success: true,
        error_message: None,
    };
    if let Err(log_err) = store.append_usage_log(&log_entry).await {
        error!("Failed to record AI usage log entry: {log_err:#}");
    }

    if let Some(metrics) = metrics {
        metrics.record_call(provider, &model, started.elapsed().as_secs_f64(), &completion.usage);
        metrics.record_outcome(provider, &model, "success");
    }

    let rate_limit = usage::check_rate_limit(store, user_id, config.daily_request_limit).await?;

    Ok(AssistantReply {
        text: completion.text,
        provider,
        model,
        usage: completion.usage,
        estimated_cost: completion.estimated_cost,
        cached: false,
        rate_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::store::memory::MemoryStore;
    use crate::store::models::UsageLogFilter;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> AiConfig {
        AiConfig {
            default_model: "gpt-4o-mini".to_string(),
            daily_request_limit: 3,
            openai: ProviderConfig {
                api_key: Some("test-key".to_string()),
                base_url: Some(base_url),
                models: vec![],
            },
            ..AiConfig::default()
        }
    }

    fn chat_request() -> AssistantRequest {
        AssistantRequest {
            feature: AssistantFeature::Chat,
            project_id: None,
            provider: None,
            model: None,
            messages: vec![ChatMessage::user("split the checkout epic")],
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            use_cache: true,
        }
    }

    async fn mock_openai(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Two stories: cart and payment."}}],
                "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_success_increments_quota_and_logs() {
        let server = MockServer::start().await;
        mock_openai(&server, 1).await;

        let store = MemoryStore::new();
        let config = test_config(server.uri());
        let clients = AiClients::from_config(&config);
        let user_id = Uuid::new_v4();

        let reply = run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap();

        assert_eq!(reply.text, "Two stories: cart and payment.");
        assert!(!reply.cached);
        assert_eq!(reply.usage.total_tokens, 42);
        assert!(reply.estimated_cost > Decimal::ZERO);
        assert_eq!(reply.rate_limit.remaining, 2);

        let logs = store
            .list_usage_logs(&UsageLogFilter::new(user_id, None, 0, 10))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].success);
        assert_eq!(logs[0].total_tokens, 42);
        assert_eq!(logs[0].provider, Provider::Openai);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider_quota_and_log() {
        let server = MockServer::start().await;
        // The second identical request must not reach the provider
        mock_openai(&server, 1).await;

        let store = MemoryStore::new();
        let config = test_config(server.uri());
        let clients = AiClients::from_config(&config);
        let user_id = Uuid::new_v4();

        let first = run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap();
        assert!(!first.cached);

        let second = run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.text, first.text);
        assert_eq!(second.estimated_cost, Decimal::ZERO);
        // Quota untouched by the cached reply
        assert_eq!(second.rate_limit.remaining, 2);

        let logs = store
            .list_usage_logs(&UsageLogFilter::new(user_id, None, 0, 10))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_opting_out_of_cache_calls_provider_again() {
        let server = MockServer::start().await;
        mock_openai(&server, 2).await;

        let store = MemoryStore::new();
        let config = test_config(server.uri());
        let clients = AiClients::from_config(&config);
        let user_id = Uuid::new_v4();

        run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap();

        let mut uncached = chat_request();
        uncached.use_cache = false;
        let reply = run_chat(&store, &clients, &config, None, user_id, uncached).await.unwrap();
        assert!(!reply.cached);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_before_provider_call() {
        let server = MockServer::start().await;
        // Limit is 3; only three calls may reach the provider. Cache is
        // disabled so each request would otherwise go through.
        mock_openai(&server, 3).await;

        let store = MemoryStore::new();
        let mut config = test_config(server.uri());
        config.cache.enabled = false;
        let clients = AiClients::from_config(&config);
        let user_id = Uuid::new_v4();

        for _ in 0..3 {
            run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap();
        }

        let err = run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap_err();
        assert!(matches!(err, Error::TooManyRequests { .. }));
    }

    #[tokio::test]
    async fn test_provider_failure_is_logged_and_does_not_consume_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let config = test_config(server.uri());
        let clients = AiClients::from_config(&config);
        let user_id = Uuid::new_v4();

        let err = run_chat(&store, &clients, &config, None, user_id, chat_request()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        let logs = store
            .list_usage_logs(&UsageLogFilter::new(user_id, None, 0, 10))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
        assert!(logs[0].error_message.as_deref().unwrap().contains("500"));

        let status = usage::check_rate_limit(&store, user_id, config.daily_request_limit).await.unwrap();
        assert_eq!(status.remaining, config.daily_request_limit);
    }

    #[tokio::test]
    async fn test_disabled_assistant_rejects() {
        let store = MemoryStore::new();
        let mut config = test_config("http://unused".to_string());
        config.enabled = false;
        let clients = AiClients::from_config(&config);

        let err = run_chat(&store, &clients, &config, None, Uuid::new_v4(), chat_request()).await.unwrap_err();
        assert!(matches!(err, Error::FeatureDisabled { .. }));
    }

    #[tokio::test]
    async fn test_disabled_feature_rejects() {
        let store = MemoryStore::new();
        let mut config = test_config("http://unused".to_string());
        config.disabled_features = vec![AssistantFeature::SprintPlanning];
        let clients = AiClients::from_config(&config);

        let mut request = chat_request();
        request.feature = AssistantFeature::SprintPlanning;
        let err = run_chat(&store, &clients, &config, None, Uuid::new_v4(), request).await.unwrap_err();
        assert!(matches!(err, Error::FeatureDisabled { feature } if feature == "sprint_planning"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_rejects() {
        let store = MemoryStore::new();
        let config = test_config("http://unused".to_string());
        let clients = AiClients::from_config(&config);

        let mut request = chat_request();
        request.provider = Some(Provider::Gemini);
        let err = run_chat(&store, &clients, &config, None, Uuid::new_v4(), request).await.unwrap_err();
        assert!(matches!(err, Error::Provider(crate::ai::AiError::NotConfigured { .. })));
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let store = MemoryStore::new();
        let config = test_config("http://unused".to_string());
        let clients = AiClients::from_config(&config);

        let mut request = chat_request();
        request.messages.clear();
        let err = run_chat(&store, &clients, &config, None, Uuid::new_v4(), request).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
