//! Persistence layer.
//!
//! The [`Store`] trait abstracts the handful of primitives the service needs
//! from its backing database: get-by-id, equality queries, inserts, field
//! updates, and an atomic counter increment. Two implementations are
//! provided:
//!
//! - [`postgres::PgStore`]: production backend over PostgreSQL (sqlx)
//! - [`memory::MemoryStore`]: in-process backend for tests and single-process
//!   deployments; data is lost on restart
//!
//! Handlers hold an `Arc<dyn Store>` so the same router serves both backends.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{EpicId, ProjectId, SprintId, StoryId, UserId};

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;

#[cfg(test)]
mod tests;

pub use errors::{Result, StoreError};
use models::{
    CachedResponse, Epic, EpicCreateRequest, Sprint, SprintCreateRequest, Story, StoryCreateRequest, StoryUpdateRequest,
    UsageCounter, UsageLogCreateRequest, UsageLogEntry, UsageLogFilter,
};

/// Storage operations used by the service.
///
/// All methods are object-safe; the trait is consumed through `Arc<dyn Store>`.
#[async_trait]
pub trait Store: Send + Sync {
    // --- sprints ---

    /// Insert a sprint and return the stored record.
    async fn create_sprint(&self, req: &SprintCreateRequest) -> Result<Sprint>;

    /// Fetch a sprint by id. `None` if it does not exist.
    async fn get_sprint(&self, id: SprintId) -> Result<Option<Sprint>>;

    /// All sprints in a project, ascending by start date.
    async fn list_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>>;

    /// Sprints with status `completed` in a project, ascending by start date.
    ///
    /// This is the input series for the velocity chart, so the ordering is
    /// part of the contract.
    async fn list_completed_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>>;

    // --- stories ---

    /// Insert a story and return the stored record.
    async fn create_story(&self, req: &StoryCreateRequest) -> Result<Story>;

    /// Fetch a story by id. `None` if it does not exist.
    async fn get_story(&self, id: StoryId) -> Result<Option<Story>>;

    /// Apply the non-`None` fields of `req` to a story.
    ///
    /// # Errors
    /// - `NotFound` if the story does not exist
    async fn update_story(&self, id: StoryId, req: &StoryUpdateRequest) -> Result<Story>;

    /// All stories in a project, newest first.
    async fn list_stories_by_project(&self, project_id: ProjectId) -> Result<Vec<Story>>;

    /// All stories linked to a sprint.
    async fn list_stories_by_sprint(&self, sprint_id: SprintId) -> Result<Vec<Story>>;

    /// All stories linked to an epic.
    async fn list_stories_by_epic(&self, epic_id: EpicId) -> Result<Vec<Story>>;

    // --- epics ---

    /// Insert an epic and return the stored record.
    async fn create_epic(&self, req: &EpicCreateRequest) -> Result<Epic>;

    /// All epics in a project, ascending by creation time.
    async fn list_epics(&self, project_id: ProjectId) -> Result<Vec<Epic>>;

    // --- usage counters ---

    /// Fetch a user's usage counter. `None` if the user has never made an
    /// AI request. Day rollover is interpreted by the caller; this is a plain
    /// read with no side effects.
    async fn get_usage_counter(&self, user_id: UserId) -> Result<Option<UsageCounter>>;

    /// Record one AI request for `user_id` on `day`.
    ///
    /// If the stored day equals `day` the count is incremented with the
    /// backend's atomic increment primitive; otherwise the counter is reset
    /// to 1 for the new day. Note that the statement itself is atomic but the
    /// surrounding check-then-increment flow is not - see
    /// [`crate::usage`] for the resulting soft-limit semantics.
    async fn increment_usage_counter(&self, user_id: UserId, day: NaiveDate) -> Result<()>;

    // --- response cache ---

    /// Look up a cached response by fingerprint. Returns whatever is stored,
    /// including stale entries; TTL interpretation happens in the caller.
    async fn get_cached_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>>;

    /// Write or overwrite a cache entry keyed by its fingerprint.
    async fn put_cached_response(&self, entry: &CachedResponse) -> Result<()>;

    // --- usage log ---

    /// Append an immutable usage-log entry and return the stored record.
    async fn append_usage_log(&self, req: &UsageLogCreateRequest) -> Result<UsageLogEntry>;

    /// List a user's usage-log entries, newest first, with pagination and an
    /// optional project filter.
    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<UsageLogEntry>>;
}
