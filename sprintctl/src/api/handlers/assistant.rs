//! HTTP handlers for the AI assistant endpoints.

use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::{
    ai::assistant::{self, AssistantReply},
    api::models::assistant::{AssistantChatRequest, ListUsageQuery, UsageLogResponse},
    auth::CurrentUser,
    errors::Result,
    store::models::UsageLogFilter,
    usage::{self, RateLimitStatus},
    AppState,
};

/// Run one governed assistant request
#[utoipa::path(
    post,
    path = "/assistant/chat",
    tag = "assistant",
    summary = "Chat with the AI assistant",
    description = "Runs a chat request through the governance pipeline: feature toggles, provider/model validation, the daily rate limit, and the response cache, calling the provider only on a cache miss.",
    request_body = AssistantChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AssistantReply),
        (status = 400, description = "Bad request - empty messages, unknown model, or unconfigured provider"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Assistant or requested feature disabled"),
        (status = 429, description = "Daily AI request limit reached"),
        (status = 502, description = "AI provider failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<AssistantChatRequest>,
) -> Result<Json<AssistantReply>> {
    let reply = assistant::run_chat(
        state.store.as_ref(),
        &state.ai_clients,
        &state.config.ai,
        state.metrics.as_ref(),
        current_user.id,
        data.into(),
    )
    .await?;

    Ok(Json(reply))
}

/// Current quota state for the caller
#[utoipa::path(
    get,
    path = "/assistant/rate-limit",
    tag = "assistant",
    summary = "Check the daily AI quota",
    description = "Returns whether another AI request is currently allowed, the remaining quota, and the configured daily limit. Read-only: does not consume quota.",
    responses(
        (status = 200, description = "Quota state", body = RateLimitStatus),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn rate_limit(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<RateLimitStatus>> {
    let status = usage::check_rate_limit(state.store.as_ref(), current_user.id, state.config.ai.daily_request_limit).await?;
    Ok(Json(status))
}

/// The caller's AI usage history
#[utoipa::path(
    get,
    path = "/assistant/usage",
    tag = "assistant",
    summary = "List AI usage-log entries",
    description = "Returns the caller's usage-log entries, newest first, optionally filtered to one project.",
    params(ListUsageQuery),
    responses(
        (status = 200, description = "Usage-log entries", body = Vec<UsageLogResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_usage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListUsageQuery>,
) -> Result<Json<Vec<UsageLogResponse>>> {
    let filter = UsageLogFilter::new(
        current_user.id,
        query.project_id,
        query.pagination.skip(),
        query.pagination.limit(),
    );
    let entries = state.store.list_usage_logs(&filter).await?;

    Ok(Json(entries.into_iter().map(UsageLogResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use crate::ai::assistant::AssistantReply;
    use crate::api::models::assistant::UsageLogResponse;
    use crate::config::{Config, ProviderConfig};
    use crate::test_utils::{create_test_app, create_test_app_with_config, test_user, USER_HEADER};
    use crate::usage::RateLimitStatus;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_openai(base_url: String) -> Config {
        let mut config = Config {
            enable_metrics: false,
            ..Config::default()
        };
        config.ai.daily_request_limit = 2;
        config.ai.openai = ProviderConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(base_url),
            models: vec![],
        };
        config
    }

    async fn mock_openai(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Try splitting it into three stories."}}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_rate_limit_endpoint_reports_full_quota() {
        let (app, _store) = create_test_app();

        let response = app
            .get("/api/v1/assistant/rate-limit")
            .add_header(USER_HEADER, test_user().to_string())
            .await;
        response.assert_status_ok();

        let status: RateLimitStatus = response.json();
        assert!(status.allowed);
        assert_eq!(status.remaining, status.limit);
    }

    #[tokio::test]
    async fn test_chat_endpoint_end_to_end() {
        let server = MockServer::start().await;
        mock_openai(&server).await;

        let (app, _store) = create_test_app_with_config(config_with_openai(server.uri()));
        let user = test_user();

        let response = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, user.to_string())
            .json(&json!({
                "feature": "story_draft",
                "messages": [{"role": "user", "content": "This epic feels too big"}]
            }))
            .await;
        response.assert_status_ok();

        let reply: AssistantReply = response.json();
        assert_eq!(reply.text, "Try splitting it into three stories.");
        assert!(!reply.cached);
        assert_eq!(reply.usage.total_tokens, 28);
        assert_eq!(reply.rate_limit.remaining, 1);

        // The attempt shows up in the caller's usage history
        let response = app
            .get("/api/v1/assistant/usage")
            .add_header(USER_HEADER, user.to_string())
            .await;
        response.assert_status_ok();
        let entries: Vec<UsageLogResponse> = response.json();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].success);
        assert_eq!(entries[0].usage.total_tokens, 28);
    }

    #[tokio::test]
    async fn test_chat_endpoint_enforces_daily_limit() {
        let server = MockServer::start().await;
        mock_openai(&server).await;

        let mut config = config_with_openai(server.uri());
        config.ai.cache.enabled = false;
        let (app, _store) = create_test_app_with_config(config);
        let user = test_user();

        for _ in 0..2 {
            let response = app
                .post("/api/v1/assistant/chat")
                .add_header(USER_HEADER, user.to_string())
                .json(&json!({"messages": [{"role": "user", "content": "plan the sprint"}]}))
                .await;
            response.assert_status_ok();
        }

        let response = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, user.to_string())
            .json(&json!({"messages": [{"role": "user", "content": "plan the sprint"}]}))
            .await;
        response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_chat_endpoint_serves_cached_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "cached answer"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (app, _store) = create_test_app_with_config(config_with_openai(server.uri()));
        let user = test_user();
        let body = json!({"messages": [{"role": "user", "content": "prioritize the backlog"}]});

        let first = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, user.to_string())
            .json(&body)
            .await;
        first.assert_status_ok();

        let second = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, user.to_string())
            .json(&body)
            .await;
        second.assert_status_ok();
        let reply: AssistantReply = second.json();
        assert!(reply.cached);
        assert_eq!(reply.text, "cached answer");
    }

    #[tokio::test]
    async fn test_chat_endpoint_without_provider_is_bad_request() {
        // Default config has no API keys at all
        let (app, _store) = create_test_app();

        let response = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, test_user().to_string())
            .json(&json!({"messages": [{"role": "user", "content": "hello"}]}))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_chat_endpoint_surfaces_provider_failure_as_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let (app, _store) = create_test_app_with_config(config_with_openai(server.uri()));

        let response = app
            .post("/api/v1/assistant/chat")
            .add_header(USER_HEADER, test_user().to_string())
            .json(&json!({"messages": [{"role": "user", "content": "hello"}]}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    }
}
