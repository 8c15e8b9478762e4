//! OpenAPI documentation configuration.
//!
//! Aggregates the `utoipa` annotations from the handler modules into one
//! document served at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{ai, analytics, api, store, usage};

/// Security scheme: caller id stamped by the upstream identity proxy.
struct ProxyHeaderAddon;

impl Modify for ProxyHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "UserHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-sprintctl-user"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "sprintctl API",
        description = "AI-usage governance and delivery analytics for agile project tracking"
    ),
    servers(
        (url = "/api/v1", description = "Management API server")
    ),
    modifiers(&ProxyHeaderAddon),
    paths(
        // Assistant
        api::handlers::assistant::chat,
        api::handlers::assistant::rate_limit,
        api::handlers::assistant::list_usage,
        // Backlog
        api::handlers::backlog::create_sprint,
        api::handlers::backlog::list_sprints,
        api::handlers::backlog::get_sprint,
        api::handlers::backlog::create_story,
        api::handlers::backlog::list_stories,
        api::handlers::backlog::update_story,
        api::handlers::backlog::create_epic,
        api::handlers::backlog::list_epics,
        // Analytics
        api::handlers::analytics::sprint_metrics,
        api::handlers::analytics::burndown,
        api::handlers::analytics::velocity,
        api::handlers::analytics::team_metrics,
        api::handlers::analytics::epic_progress,
        api::handlers::analytics::workload,
    ),
    components(
        schemas(
            // Assistant
            api::models::assistant::AssistantChatRequest,
            api::models::assistant::UsageLogResponse,
            ai::assistant::AssistantReply,
            ai::Provider,
            ai::ChatRole,
            ai::ChatMessage,
            ai::TokenUsage,
            usage::RateLimitStatus,
            store::models::AssistantFeature,
            // Backlog
            api::models::backlog::SprintCreate,
            api::models::backlog::SprintResponse,
            api::models::backlog::StoryCreate,
            api::models::backlog::StoryUpdate,
            api::models::backlog::StoryResponse,
            api::models::backlog::EpicCreate,
            api::models::backlog::EpicResponse,
            store::models::SprintStatus,
            store::models::StoryStatus,
            store::models::StoryPriority,
            // Analytics
            analytics::SprintMetrics,
            analytics::VelocityPoint,
            analytics::BurndownPoint,
            analytics::BurndownReport,
            analytics::TeamMetrics,
            analytics::EpicProgress,
            analytics::WorkloadItem,
        )
    ),
    tags(
        (name = "assistant", description = "Governed AI assistant"),
        (name = "backlog", description = "Sprints, stories, and epics"),
        (name = "analytics", description = "Derived delivery metrics"),
    )
)]
pub struct ApiDoc;
