//! Delivery analytics.
//!
//! Read-only views - sprint metrics, velocity, burndown, team averages, epic
//! progress, workload - recomputed on demand from current sprint/story
//! records. Nothing here is persisted or cached; every page load sees the
//! store as it is now.
//!
//! The fetch layer issues one story query per sprint. That fan-out matches
//! the access pattern the data model was designed around and is fine at team
//! scale; batching the queries would be an optimization, not a correctness
//! change.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::store::models::SprintStatus;
use crate::store::Store;
use crate::types::{EpicId, ProjectId, SprintId, UserId};

pub mod compute;

/// Planned vs. completed rollup for one sprint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SprintMetrics {
    #[schema(value_type = String, format = "uuid")]
    pub sprint_id: SprintId,
    pub name: String,
    pub status: SprintStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_points: i32,
    /// Sum of points over all linked stories
    pub planned_points: i64,
    /// Sum of points over stories with status `done`
    pub completed_points: i64,
    pub total_stories: i64,
    pub completed_stories: i64,
    /// completed_stories / total_stories * 100 (0 when the sprint is empty)
    pub completion_rate: f64,
}

/// One sprint on the velocity chart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VelocityPoint {
    #[schema(value_type = String, format = "uuid")]
    pub sprint_id: SprintId,
    pub name: String,
    pub start_date: NaiveDate,
    pub planned_points: i64,
    pub completed_points: i64,
}

/// One day on the burndown chart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BurndownPoint {
    pub day: NaiveDate,
    /// Linear reference line from total points down to zero
    pub ideal_remaining: f64,
    /// Approximated actual remaining; absent for days still in the future
    pub actual_remaining: Option<f64>,
}

/// Burndown series for one sprint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BurndownReport {
    #[schema(value_type = String, format = "uuid")]
    pub sprint_id: SprintId,
    pub total_points: i64,
    pub points: Vec<BurndownPoint>,
}

/// Averages across a project's completed sprints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMetrics {
    pub sprints_completed: i64,
    pub average_velocity: f64,
    pub average_completion_rate: f64,
}

/// Per-epic completion rollup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EpicProgress {
    #[schema(value_type = String, format = "uuid")]
    pub epic_id: EpicId,
    pub name: String,
    pub total_stories: i64,
    pub completed_stories: i64,
    pub total_points: i64,
    pub completed_points: i64,
    /// completed_points / total_points * 100 (0 for an epic with no points)
    pub progress_percentage: f64,
}

/// Per-assignee load within a project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkloadItem {
    /// `None` groups the unassigned backlog
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assignee: Option<UserId>,
    pub story_count: i64,
    pub total_points: i64,
    pub completed_points: i64,
}

/// Compute planned/completed points and completion rate for one sprint.
///
/// # Errors
/// - `NotFound` if the sprint does not exist
#[instrument(skip(store), err)]
pub async fn sprint_metrics(store: &dyn Store, sprint_id: SprintId) -> Result<SprintMetrics> {
    let sprint = store.get_sprint(sprint_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Sprint".to_string(),
        id: sprint_id.to_string(),
    })?;
    let stories = store.list_stories_by_sprint(sprint_id).await?;

    Ok(compute::sprint_metrics(&sprint, &stories))
}

/// Velocity series: completed sprints ascending by start date, each with its
/// planned and completed points.
#[instrument(skip(store), err)]
pub async fn velocity(store: &dyn Store, project_id: ProjectId) -> Result<Vec<VelocityPoint>> {
    let sprints = store.list_completed_sprints(project_id).await?;

    let mut series = Vec::with_capacity(sprints.len());
    for sprint in &sprints {
        let stories = store.list_stories_by_sprint(sprint.id).await?;
        series.push(compute::velocity_point(sprint, &stories));
    }

    Ok(series)
}

/// Burndown series for a sprint: linear ideal line plus an approximated
/// actual line derived from current totals (no daily snapshots exist).
///
/// # Errors
/// - `NotFound` if the sprint does not exist
#[instrument(skip(store), err)]
pub async fn burndown(store: &dyn Store, sprint_id: SprintId) -> Result<BurndownReport> {
    let sprint = store.get_sprint(sprint_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Sprint".to_string(),
        id: sprint_id.to_string(),
    })?;
    let stories = store.list_stories_by_sprint(sprint_id).await?;

    Ok(compute::burndown(&sprint, &stories, Utc::now().date_naive()))
}

/// Average velocity and completion rate across completed sprints.
#[instrument(skip(store), err)]
pub async fn team_metrics(store: &dyn Store, project_id: ProjectId) -> Result<TeamMetrics> {
    let sprints = store.list_completed_sprints(project_id).await?;

    let mut per_sprint = Vec::with_capacity(sprints.len());
    for sprint in &sprints {
        let stories = store.list_stories_by_sprint(sprint.id).await?;
        per_sprint.push(compute::sprint_metrics(sprint, &stories));
    }

    Ok(compute::team_metrics(&per_sprint))
}

/// Per-epic progress rollups for a project.
#[instrument(skip(store), err)]
pub async fn epic_progress(store: &dyn Store, project_id: ProjectId) -> Result<Vec<EpicProgress>> {
    let epics = store.list_epics(project_id).await?;

    let mut rollups = Vec::with_capacity(epics.len());
    for epic in &epics {
        let stories = store.list_stories_by_epic(epic.id).await?;
        rollups.push(compute::epic_progress(epic, &stories));
    }

    Ok(rollups)
}

/// Per-assignee workload for a project.
#[instrument(skip(store), err)]
pub async fn workload(store: &dyn Store, project_id: ProjectId) -> Result<Vec<WorkloadItem>> {
    let stories = store.list_stories_by_project(project_id).await?;
    Ok(compute::workload(&stories))
}
