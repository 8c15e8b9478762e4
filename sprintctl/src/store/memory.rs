//! In-memory store implementation.
//!
//! Stores all records in concurrent hash maps. Suitable for tests and
//! single-process deployments; data is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

use super::errors::{Result, StoreError};
use super::models::*;
use super::Store;
use crate::types::{EpicId, ProjectId, SprintId, StoryId, UserId};

/// In-memory implementation of the [`Store`] trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    sprints: HashMap<SprintId, Sprint>,
    stories: HashMap<StoryId, Story>,
    epics: HashMap<EpicId, Epic>,
    counters: HashMap<UserId, UsageCounter>,
    cache: HashMap<String, CachedResponse>,
    usage_log: Vec<UsageLogEntry>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_sprint(&self, req: &SprintCreateRequest) -> Result<Sprint> {
        let sprint = Sprint {
            id: new_id(),
            project_id: req.project_id,
            name: req.name.clone(),
            goal: req.goal.clone(),
            status: req.status,
            start_date: req.start_date,
            end_date: req.end_date,
            capacity_points: req.capacity_points,
            created_at: Utc::now(),
        };
        self.inner.write().sprints.insert(sprint.id, sprint.clone());
        Ok(sprint)
    }

    async fn get_sprint(&self, id: SprintId) -> Result<Option<Sprint>> {
        Ok(self.inner.read().sprints.get(&id).cloned())
    }

    async fn list_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>> {
        let inner = self.inner.read();
        let mut sprints: Vec<Sprint> = inner.sprints.values().filter(|s| s.project_id == project_id).cloned().collect();
        sprints.sort_by_key(|s| s.start_date);
        Ok(sprints)
    }

    async fn list_completed_sprints(&self, project_id: ProjectId) -> Result<Vec<Sprint>> {
        let inner = self.inner.read();
        let mut sprints: Vec<Sprint> = inner
            .sprints
            .values()
            .filter(|s| s.project_id == project_id && s.status == SprintStatus::Completed)
            .cloned()
            .collect();
        sprints.sort_by_key(|s| s.start_date);
        Ok(sprints)
    }

    async fn create_story(&self, req: &StoryCreateRequest) -> Result<Story> {
        let now = Utc::now();
        let story = Story {
            id: new_id(),
            project_id: req.project_id,
            sprint_id: req.sprint_id,
            epic_id: req.epic_id,
            title: req.title.clone(),
            description: req.description.clone(),
            status: req.status,
            priority: req.priority,
            points: req.points,
            assignee: req.assignee,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().stories.insert(story.id, story.clone());
        Ok(story)
    }

    async fn get_story(&self, id: StoryId) -> Result<Option<Story>> {
        Ok(self.inner.read().stories.get(&id).cloned())
    }

    async fn update_story(&self, id: StoryId, req: &StoryUpdateRequest) -> Result<Story> {
        let mut inner = self.inner.write();
        let story = inner.stories.get_mut(&id).ok_or(StoreError::NotFound)?;
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
        story.updated_at = Utc::now();
        Ok(story.clone())
    }

    async fn list_stories_by_project(&self, project_id: ProjectId) -> Result<Vec<Story>> {
        let inner = self.inner.read();
        let mut stories: Vec<Story> = inner.stories.values().filter(|s| s.project_id == project_id).cloned().collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stories)
    }

    async fn list_stories_by_sprint(&self, sprint_id: SprintId) -> Result<Vec<Story>> {
        let inner = self.inner.read();
        let mut stories: Vec<Story> = inner.stories.values().filter(|s| s.sprint_id == Some(sprint_id)).cloned().collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stories)
    }

    async fn list_stories_by_epic(&self, epic_id: EpicId) -> Result<Vec<Story>> {
        let inner = self.inner.read();
        let mut stories: Vec<Story> = inner.stories.values().filter(|s| s.epic_id == Some(epic_id)).cloned().collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stories)
    }

    async fn create_epic(&self, req: &EpicCreateRequest) -> Result<Epic> {
        let epic = Epic {
            id: new_id(),
            project_id: req.project_id,
            name: req.name.clone(),
            description: req.description.clone(),
            created_at: Utc::now(),
        };
        self.inner.write().epics.insert(epic.id, epic.clone());
        Ok(epic)
    }

    async fn list_epics(&self, project_id: ProjectId) -> Result<Vec<Epic>> {
        let inner = self.inner.read();
        let mut epics: Vec<Epic> = inner.epics.values().filter(|e| e.project_id == project_id).cloned().collect();
        epics.sort_by_key(|e| e.created_at);
        Ok(epics)
    }

    async fn get_usage_counter(&self, user_id: UserId) -> Result<Option<UsageCounter>> {
        Ok(self.inner.read().counters.get(&user_id).cloned())
    }

    async fn increment_usage_counter(&self, user_id: UserId, day: NaiveDate) -> Result<()> {
        let mut inner = self.inner.write();
        let now = Utc::now();
        match inner.counters.get_mut(&user_id) {
            Some(counter) if counter.day == day => {
                counter.count += 1;
                counter.updated_at = now;
            }
            Some(counter) => {
                // Day rollover: previous day's count no longer applies
                counter.day = day;
                counter.count = 1;
                counter.updated_at = now;
            }
            None => {
                inner.counters.insert(
                    user_id,
                    UsageCounter {
                        user_id,
                        day,
                        count: 1,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn get_cached_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>> {
        Ok(self.inner.read().cache.get(fingerprint).cloned())
    }

    async fn put_cached_response(&self, entry: &CachedResponse) -> Result<()> {
        self.inner.write().cache.insert(entry.fingerprint.clone(), entry.clone());
        Ok(())
    }

    async fn append_usage_log(&self, req: &UsageLogCreateRequest) -> Result<UsageLogEntry> {
        let entry = UsageLogEntry {
            id: new_id(),
            user_id: req.user_id,
            project_id: req.project_id,
            provider: req.provider,
            model: req.model.clone(),
            feature: req.feature,
            prompt_tokens: req.prompt_tokens,
            completion_tokens: req.completion_tokens,
            total_tokens: req.total_tokens,
            estimated_cost: req.estimated_cost,
            latency_ms: req.latency_ms,
            success: req.success,
            error_message: req.error_message.clone(),
            created_at: Utc::now(),
        };
        self.inner.write().usage_log.push(entry.clone());
        Ok(entry)
    }

    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<UsageLogEntry>> {
        let inner = self.inner.read();
        let entries: Vec<UsageLogEntry> = inner
            .usage_log
            .iter()
            .rev()
            .filter(|e| e.user_id == filter.user_id)
            .filter(|e| filter.project_id.is_none() || e.project_id == filter.project_id)
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(entries)
    }
}
