//! PostgreSQL store implementation.
//!
//! Queries use the runtime-checked sqlx API (`query_as::<_, T>`) so the crate
//! builds without a live database. Migrations live in `migrations/` and are
//! applied by [`crate::migrator`] at startup.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::errors::{Result, StoreError};
use super::models::*;
use super::Store;
use crate::types::{EpicId, ProjectId, SprintId, StoryId, UserId};

/// PostgreSQL implementation of the [`Store`] trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (health checks, tests).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_sprint(&self, req: &SprintCreateRequest) -> Result<Sprint> {
        let sprint = sqlx::query_as::<_, Sprint>(
            r#"
            INSERT INTO sprints (project_id, name, goal, status, start_date, end_date, capacity_points)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(req.project_id)
        .bind(&req.name)
        .bind(&req.goal)
        .bind(req.status)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.capacity_points)
        .fetch_one(&self.pool)
        .await?;

        Ok(sprint)
    }

    async fn get_sprint(&self, id: SprintId) -> Result<Option<Sprint>> {
        let sprint = sqlx::query_as::<_, Sprint>("SELECT * FROM sprints WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sprint)
    }

    async fn list_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>> {
        let sprints = sqlx::query_as::<_, Sprint>("SELECT * FROM sprints WHERE project_id = $1 ORDER BY start_date ASC")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sprints)
    }

    async fn list_completed_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>> {
        let sprints = sqlx::query_as::<_, Sprint>(
            "SELECT * FROM sprints WHERE project_id = $1 AND status = 'completed' ORDER BY start_date ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sprints)
    }

    async fn create_story(&self, req: &StoryCreateRequest) -> Result<Story> {
        let story = sqlx::query_as::<_, Story>(
            r#"
            INSERT INTO stories (project_id, sprint_id, epic_id, title, description, status, priority, points, assignee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(req.project_id)
        .bind(req.sprint_id)
        .bind(req.epic_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.status)
        .bind(req.priority)
        .bind(req.points)
        .bind(req.assignee)
        .fetch_one(&self.pool)
        .await?;

        Ok(story)
    }

    async fn get_story(&self, id: StoryId) -> Result<Option<Story>> {
        let story = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(story)
    }

    async fn update_story(&self, id: StoryId, req: &StoryUpdateRequest) -> Result<Story> {
        // Whole-record read-then-write, matching the document-style update
        // semantics of the rest of the store. Field-level patches are applied
        // in memory before a single UPDATE.
        let mut story = self.get_story(id).await?.ok_or(StoreError::NotFound)?;

        if let Some(sprint_id) = &req.sprint_id {
            story.sprint_id = *sprint_id;
        }
        if let Some(epic_id) = &req.epic_id {
            story.epic_id = *epic_id;
        }
        if let Some(title) = &req.title {
            story.title = title.clone();
        }
        if let Some(description) = &req.description {
            story.description = Some(description.clone());
        }
        if let Some(status) = req.status {
            story.status = status;
        }
        if let Some(priority) = req.priority {
            story.priority = priority;
        }
        if let Some(points) = req.points {
            story.points = points;
        }
        if let Some(assignee) = &req.assignee {
            story.assignee = *assignee;
        }

        let updated = sqlx::query_as::<_, Story>(
            r#"
            UPDATE stories
            SET sprint_id = $2, epic_id = $3, title = $4, description = $5,
                status = $6, priority = $7, points = $8, assignee = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(story.sprint_id)
        .bind(story.epic_id)
        .bind(&story.title)
        .bind(&story.description)
        .bind(story.status)
        .bind(story.priority)
        .bind(story.points)
        .bind(story.assignee)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn list_stories_by_project(&self, project_id: ProjectId) -> Result<Vec<Story>> {
        let stories = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE project_id = $1 ORDER BY created_at DESC")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(stories)
    }

    async fn list_stories_by_sprint(&self, sprint_id: SprintId) -> Result<Vec<Story>> {
        let stories = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE sprint_id = $1 ORDER BY created_at DESC")
            .bind(sprint_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(stories)
    }

    async fn list_stories_by_epic(&self, epic_id: EpicId) -> Result<Vec<Story>> {
        let stories = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE epic_id = $1 ORDER BY created_at DESC")
            .bind(epic_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(stories)
    }

    async fn create_epic(&self, req: &EpicCreateRequest) -> Result<Epic> {
        let epic = sqlx::query_as::<_, Epic>(
            r#"
            INSERT INTO epics (project_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(req.project_id)
        .bind(&req.name)
        .bind(&req.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(epic)
    }

    async fn list_epics(&self, project_id: ProjectId) -> Result<Vec<Epic>> {
        let epics = sqlx::query_as::<_, Epic>("SELECT * FROM epics WHERE project_id = $1 ORDER BY created_at ASC")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(epics)
    }

    async fn get_usage_counter(&self, user_id: UserId) -> Result<Option<UsageCounter>> {
        let counter = sqlx::query_as::<_, UsageCounter>("SELECT * FROM usage_counters WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(counter)
    }

    async fn increment_usage_counter(&self, user_id: UserId, day: NaiveDate) -> Result<()> {
        // Single upsert: same-day rows use the database increment primitive,
        // a stale row is reset to 1 for the new day. The statement is atomic
        // but the caller's check-then-increment pair is not.
        sqlx::query(
            r#"
            INSERT INTO usage_counters (user_id, day, count, updated_at)
            VALUES ($1, $2, 1, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET count = CASE
                    WHEN usage_counters.day = EXCLUDED.day THEN usage_counters.count + 1
                    ELSE 1
                END,
                day = EXCLUDED.day,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(day)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_cached_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>> {
        let entry = sqlx::query_as::<_, CachedResponse>("SELECT * FROM ai_response_cache WHERE fingerprint = $1")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn put_cached_response(&self, entry: &CachedResponse) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_response_cache (fingerprint, provider, model, response_text, token_count, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (fingerprint) DO UPDATE
            SET provider = EXCLUDED.provider,
                model = EXCLUDED.model,
                response_text = EXCLUDED.response_text,
                token_count = EXCLUDED.token_count,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&entry.fingerprint)
        .bind(entry.provider)
        .bind(&entry.model)
        .bind(&entry.response_text)
        .bind(entry.token_count)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_usage_log(&self, req: &UsageLogCreateRequest) -> Result<UsageLogEntry> {
        let entry = sqlx::query_as::<_, UsageLogEntry>(
            r#"
            INSERT INTO ai_usage_log
                (user_id, project_id, provider, model, feature, prompt_tokens, completion_tokens,
                 total_tokens, estimated_cost, latency_ms, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(req.project_id)
        .bind(req.provider)
        .bind(&req.model)
        .bind(req.feature)
        .bind(req.prompt_tokens)
        .bind(req.completion_tokens)
        .bind(req.total_tokens)
        .bind(req.estimated_cost)
        .bind(req.latency_ms)
        .bind(req.success)
        .bind(&req.error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<UsageLogEntry>> {
        let entries = if let Some(project_id) = filter.project_id {
            sqlx::query_as::<_, UsageLogEntry>(
                r#"
                SELECT * FROM ai_usage_log
                WHERE user_id = $1 AND project_id = $2
                ORDER BY created_at DESC, id DESC
                OFFSET $3
                LIMIT $4
                "#,
            )
            .bind(filter.user_id)
            .bind(project_id)
            .bind(filter.skip)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, UsageLogEntry>(
                r#"
                SELECT * FROM ai_usage_log
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                OFFSET $2
                LIMIT $3
                "#,
            )
            .bind(filter.user_id)
            .bind(filter.skip)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(entries)
    }
}
