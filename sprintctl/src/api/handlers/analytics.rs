//! HTTP handlers for delivery analytics endpoints.
//!
//! All outputs are recomputed from current store state on every request;
//! nothing here is cached or persisted.

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::{
    analytics::{self, BurndownReport, EpicProgress, SprintMetrics, TeamMetrics, VelocityPoint, WorkloadItem},
    auth::CurrentUser,
    errors::Result,
    types::{ProjectId, SprintId},
    AppState,
};

/// Planned/completed rollup for one sprint
#[utoipa::path(
    get,
    path = "/sprints/{id}/metrics",
    tag = "analytics",
    summary = "Sprint metrics",
    description = "Planned and completed points plus story-count completion rate for one sprint.",
    params(("id" = String, Path, description = "Sprint ID")),
    responses(
        (status = 200, description = "Sprint metrics", body = SprintMetrics),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Sprint not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn sprint_metrics(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<SprintId>,
) -> Result<Json<SprintMetrics>> {
    Ok(Json(analytics::sprint_metrics(state.store.as_ref(), id).await?))
}

/// Burndown series for one sprint
#[utoipa::path(
    get,
    path = "/sprints/{id}/burndown",
    tag = "analytics",
    summary = "Sprint burndown",
    description = "Idealized linear burndown plus an approximated actual series reconstructed from current totals (no daily snapshots are kept).",
    params(("id" = String, Path, description = "Sprint ID")),
    responses(
        (status = 200, description = "Burndown series", body = BurndownReport),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Sprint not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn burndown(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<SprintId>,
) -> Result<Json<BurndownReport>> {
    Ok(Json(analytics::burndown(state.store.as_ref(), id).await?))
}

/// Velocity chart series for a project
#[utoipa::path(
    get,
    path = "/projects/{id}/velocity",
    tag = "analytics",
    summary = "Velocity series",
    description = "Completed sprints in ascending start-date order with their planned and completed points.",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Velocity series", body = Vec<VelocityPoint>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn velocity(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<Vec<VelocityPoint>>> {
    Ok(Json(analytics::velocity(state.store.as_ref(), id).await?))
}

/// Team averages across completed sprints
#[utoipa::path(
    get,
    path = "/projects/{id}/team-metrics",
    tag = "analytics",
    summary = "Team metrics",
    description = "Average velocity and completion rate across a project's completed sprints.",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Team metrics", body = TeamMetrics),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn team_metrics(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<TeamMetrics>> {
    Ok(Json(analytics::team_metrics(state.store.as_ref(), id).await?))
}

/// Per-epic completion rollups
#[utoipa::path(
    get,
    path = "/projects/{id}/epic-progress",
    tag = "analytics",
    summary = "Epic progress",
    description = "Completed vs. total story counts and points per epic, with a points-based percentage.",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Epic rollups", body = Vec<EpicProgress>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn epic_progress(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<Vec<EpicProgress>>> {
    Ok(Json(analytics::epic_progress(state.store.as_ref(), id).await?))
}

/// Per-assignee workload
#[utoipa::path(
    get,
    path = "/projects/{id}/workload",
    tag = "analytics",
    summary = "Team workload",
    description = "Story counts and point totals grouped by assignee, heaviest load first. Unassigned stories are grouped under a null assignee.",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Workload items", body = Vec<WorkloadItem>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn workload(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<Vec<WorkloadItem>>> {
    Ok(Json(analytics::workload(state.store.as_ref(), id).await?))
}
