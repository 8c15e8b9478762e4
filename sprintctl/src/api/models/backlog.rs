//! Request/response models for sprint, story, and epic endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::store::models::{
    Epic, EpicCreateRequest, Sprint, SprintCreateRequest, SprintStatus, Story, StoryCreateRequest, StoryPriority, StoryStatus,
    StoryUpdateRequest,
};
use crate::types::{EpicId, ProjectId, SprintId, StoryId, UserId};

// Request models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SprintCreate {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub name: String,
    pub goal: Option<String>,
    #[serde(default = "default_sprint_status")]
    pub status: SprintStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub capacity_points: i32,
}

fn default_sprint_status() -> SprintStatus {
    SprintStatus::Planning
}

impl From<SprintCreate> for SprintCreateRequest {
    fn from(api: SprintCreate) -> Self {
        Self {
            project_id: api.project_id,
            name: api.name,
            goal: api.goal,
            status: api.status,
            start_date: api.start_date,
            end_date: api.end_date,
            capacity_points: api.capacity_points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryCreate {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub sprint_id: Option<SprintId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_story_status")]
    pub status: StoryStatus,
    #[serde(default = "default_story_priority")]
    pub priority: StoryPriority,
    #[serde(default)]
    pub points: i32,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assignee: Option<UserId>,
}

fn default_story_status() -> StoryStatus {
    StoryStatus::Backlog
}

fn default_story_priority() -> StoryPriority {
    StoryPriority::Should
}

impl From<StoryCreate> for StoryCreateRequest {
    fn from(api: StoryCreate) -> Self {
        Self {
            project_id: api.project_id,
            sprint_id: api.sprint_id,
            epic_id: api.epic_id,
            title: api.title,
            description: api.description,
            status: api.status,
            priority: api.priority,
            points: api.points,
            assignee: api.assignee,
        }
    }
}

/// Partial story update; absent fields are left unchanged. `sprint_id`,
/// `epic_id` and `assignee` accept an explicit `null` to clear the link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StoryUpdate {
    /// Absent = unchanged, null = detach from sprint
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub sprint_id: Option<Option<SprintId>>,
    /// Absent = unchanged, null = detach from epic
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub epic_id: Option<Option<EpicId>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StoryStatus>,
    pub priority: Option<StoryPriority>,
    pub points: Option<i32>,
    /// Absent = unchanged, null = unassign
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assignee: Option<Option<UserId>>,
}

impl From<StoryUpdate> for StoryUpdateRequest {
    fn from(api: StoryUpdate) -> Self {
        Self {
            sprint_id: api.sprint_id,
            epic_id: api.epic_id,
            title: api.title,
            description: api.description,
            status: api.status,
            priority: api.priority,
            points: api.points,
            assignee: api.assignee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EpicCreate {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
}

impl From<EpicCreate> for EpicCreateRequest {
    fn from(api: EpicCreate) -> Self {
        Self {
            project_id: api.project_id,
            name: api.name,
            description: api.description,
        }
    }
}

// Response models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SprintResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SprintId,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_points: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Sprint> for SprintResponse {
    fn from(sprint: Sprint) -> Self {
        Self {
            id: sprint.id,
            project_id: sprint.project_id,
            name: sprint.name,
            goal: sprint.goal,
            status: sprint.status,
            start_date: sprint.start_date,
            end_date: sprint.end_date,
            capacity_points: sprint.capacity_points,
            created_at: sprint.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StoryId,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub sprint_id: Option<SprintId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    pub status: StoryStatus,
    pub priority: StoryPriority,
    pub points: i32,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assignee: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            project_id: story.project_id,
            sprint_id: story.sprint_id,
            epic_id: story.epic_id,
            title: story.title,
            description: story.description,
            status: story.status,
            priority: story.priority,
            points: story.points,
            assignee: story.assignee,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EpicResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EpicId,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Epic> for EpicResponse {
    fn from(epic: Epic) -> Self {
        Self {
            id: epic.id,
            project_id: epic.project_id,
            name: epic.name,
            description: epic.description,
            created_at: epic.created_at,
        }
    }
}

// Query models

/// Query parameters for listing sprints
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSprintsQuery {
    #[param(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
}

/// Query parameters for listing stories; exactly one scope is required
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListStoriesQuery {
    #[param(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub sprint_id: Option<SprintId>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub epic_id: Option<EpicId>,
}

/// Query parameters for listing epics
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEpicsQuery {
    #[param(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
}
