//! Record structures persisted by the store.
//!
//! These mirror the table schemas in `migrations/` and are shared by the
//! PostgreSQL and in-memory backends. API-facing shapes live in
//! [`crate::api::models`] and are converted from these.

use crate::ai::Provider;
use crate::types::{EpicId, ProjectId, SprintId, StoryId, UsageLogId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Sprint lifecycle state stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    Planning,
    Active,
    Completed,
}

/// Story workflow state stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
}

/// MoSCoW priority stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StoryPriority {
    Must,
    Should,
    Could,
    Wont,
}

/// Assistant feature the caller invoked, stored as TEXT in database.
///
/// Recorded on every usage-log entry so spend can be broken down per feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssistantFeature {
    StoryDraft,
    AcceptanceCriteria,
    SprintPlanning,
    BacklogPriority,
    Chat,
}

/// A sprint record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sprint {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_points: i32,
    pub created_at: DateTime<Utc>,
}

/// Store request for creating a sprint
#[derive(Debug, Clone)]
pub struct SprintCreateRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_points: i32,
}

/// A story record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Story {
    pub id: StoryId,
    pub project_id: ProjectId,
    pub sprint_id: Option<SprintId>,
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    pub status: StoryStatus,
    pub priority: StoryPriority,
    pub points: i32,
    pub assignee: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store request for creating a story
#[derive(Debug, Clone)]
pub struct StoryCreateRequest {
    pub project_id: ProjectId,
    pub sprint_id: Option<SprintId>,
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    pub status: StoryStatus,
    pub priority: StoryPriority,
    pub points: i32,
    pub assignee: Option<UserId>,
}

/// Store request for updating a story. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct StoryUpdateRequest {
    pub sprint_id: Option<Option<SprintId>>,
    pub epic_id: Option<Option<EpicId>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StoryStatus>,
    pub priority: Option<StoryPriority>,
    pub points: Option<i32>,
    pub assignee: Option<Option<UserId>>,
}

/// An epic record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Epic {
    pub id: EpicId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Store request for creating an epic
#[derive(Debug, Clone)]
pub struct EpicCreateRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
}

/// Per-user daily AI request counter.
///
/// One row per user. The counter is never reset by a background job: a stored
/// `day` older than the current day means the count no longer applies and the
/// full daily quota is available. Rows are created on first use and only ever
/// grow within a day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageCounter {
    pub user_id: UserId,
    pub day: NaiveDate,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}

/// A cached AI response keyed by prompt fingerprint.
///
/// Valid only while `expires_at` is in the future. Stale rows are ignored on
/// read, never actively deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CachedResponse {
    pub fingerprint: String,
    pub provider: Provider,
    pub model: String,
    pub response_text: String,
    pub token_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Append-only record of one AI invocation attempt. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageLogEntry {
    pub id: UsageLogId,
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub provider: Provider,
    pub model: String,
    pub feature: AssistantFeature,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub estimated_cost: Decimal,
    pub latency_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Store request for appending a usage-log entry
#[derive(Debug, Clone)]
pub struct UsageLogCreateRequest {
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub provider: Provider,
    pub model: String,
    pub feature: AssistantFeature,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub estimated_cost: Decimal,
    pub latency_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Filter for listing usage-log entries
#[derive(Debug, Clone)]
pub struct UsageLogFilter {
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub skip: i64,
    pub limit: i64,
}

impl UsageLogFilter {
    pub fn new(user_id: UserId, project_id: Option<ProjectId>, skip: i64, limit: i64) -> Self {
        Self {
            user_id,
            project_id,
            skip,
            limit,
        }
    }
}

/// Generate a fresh record id. Both backends assign ids on insert so callers
/// never pick them.
pub(crate) fn new_id() -> Uuid {
    Uuid::new_v4()
}
