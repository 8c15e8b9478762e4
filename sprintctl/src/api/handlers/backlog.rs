//! HTTP handlers for sprint, story, and epic endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    api::models::backlog::{
        EpicCreate, EpicResponse, ListEpicsQuery, ListSprintsQuery, ListStoriesQuery, SprintCreate, SprintResponse, StoryCreate,
        StoryResponse, StoryUpdate,
    },
    auth::CurrentUser,
    errors::{Error, Result},
    store::StoreError,
    types::{SprintId, StoryId},
    AppState,
};

/// Create a sprint
#[utoipa::path(
    post,
    path = "/sprints",
    tag = "backlog",
    summary = "Create a sprint",
    request_body = SprintCreate,
    responses(
        (status = 201, description = "Sprint created", body = SprintResponse),
        (status = 400, description = "Bad request - end date before start date"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_sprint(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(data): Json<SprintCreate>,
) -> Result<(StatusCode, Json<SprintResponse>)> {
    if data.end_date < data.start_date {
        return Err(Error::BadRequest {
            message: "Sprint end date must not be before its start date".to_string(),
        });
    }

    let sprint = state.store.create_sprint(&data.into()).await?;
    Ok((StatusCode::CREATED, Json(SprintResponse::from(sprint))))
}

/// List sprints in a project
#[utoipa::path(
    get,
    path = "/sprints",
    tag = "backlog",
    summary = "List sprints",
    params(ListSprintsQuery),
    responses(
        (status = 200, description = "Sprints ascending by start date", body = Vec<SprintResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_sprints(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListSprintsQuery>,
) -> Result<Json<Vec<SprintResponse>>> {
    let sprints = state.store.list_sprints(query.project_id).await?;
    Ok(Json(sprints.into_iter().map(SprintResponse::from).collect()))
}

/// Get one sprint
#[utoipa::path(
    get,
    path = "/sprints/{id}",
    tag = "backlog",
    summary = "Get a sprint",
    params(("id" = String, Path, description = "Sprint ID")),
    responses(
        (status = 200, description = "Sprint", body = SprintResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Sprint not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_sprint(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<SprintId>,
) -> Result<Json<SprintResponse>> {
    let sprint = state.store.get_sprint(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Sprint".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(SprintResponse::from(sprint)))
}

/// Create a story
#[utoipa::path(
    post,
    path = "/stories",
    tag = "backlog",
    summary = "Create a story",
    request_body = StoryCreate,
    responses(
        (status = 201, description = "Story created", body = StoryResponse),
        (status = 400, description = "Bad request - negative points"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_story(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(data): Json<StoryCreate>,
) -> Result<(StatusCode, Json<StoryResponse>)> {
    if data.points < 0 {
        return Err(Error::BadRequest {
            message: "Story points must not be negative".to_string(),
        });
    }

    let story = state.store.create_story(&data.into()).await?;
    Ok((StatusCode::CREATED, Json(StoryResponse::from(story))))
}

/// List stories by project, sprint, or epic
#[utoipa::path(
    get,
    path = "/stories",
    tag = "backlog",
    summary = "List stories",
    description = "Exactly one of project_id, sprint_id, or epic_id must be supplied.",
    params(ListStoriesQuery),
    responses(
        (status = 200, description = "Stories, newest first", body = Vec<StoryResponse>),
        (status = 400, description = "Bad request - missing or ambiguous scope"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_stories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListStoriesQuery>,
) -> Result<Json<Vec<StoryResponse>>> {
    let stories = match (query.project_id, query.sprint_id, query.epic_id) {
        (Some(project_id), None, None) => state.store.list_stories_by_project(project_id).await?,
        (None, Some(sprint_id), None) => state.store.list_stories_by_sprint(sprint_id).await?,
        (None, None, Some(epic_id)) => state.store.list_stories_by_epic(epic_id).await?,
        _ => {
            return Err(Error::BadRequest {
                message: "Provide exactly one of project_id, sprint_id, or epic_id".to_string(),
            });
        }
    };

    Ok(Json(stories.into_iter().map(StoryResponse::from).collect()))
}

/// Update a story
#[utoipa::path(
    patch,
    path = "/stories/{id}",
    tag = "backlog",
    summary = "Update a story",
    description = "Partial update; absent fields are left unchanged. sprint_id, epic_id, and assignee accept null to clear the link.",
    params(("id" = String, Path, description = "Story ID")),
    request_body = StoryUpdate,
    responses(
        (status = 200, description = "Updated story", body = StoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_story(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<StoryId>,
    Json(data): Json<StoryUpdate>,
) -> Result<Json<StoryResponse>> {
    if let Some(points) = data.points {
        if points < 0 {
            return Err(Error::BadRequest {
                message: "Story points must not be negative".to_string(),
            });
        }
    }

    let story = state.store.update_story(id, &data.into()).await.map_err(|err| match err {
        StoreError::NotFound => Error::NotFound {
            resource: "Story".to_string(),
            id: id.to_string(),
        },
        other => other.into(),
    })?;

    Ok(Json(StoryResponse::from(story)))
}

/// Create an epic
#[utoipa::path(
    post,
    path = "/epics",
    tag = "backlog",
    summary = "Create an epic",
    request_body = EpicCreate,
    responses(
        (status = 201, description = "Epic created", body = EpicResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_epic(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(data): Json<EpicCreate>,
) -> Result<(StatusCode, Json<EpicResponse>)> {
    let epic = state.store.create_epic(&data.into()).await?;
    Ok((StatusCode::CREATED, Json(EpicResponse::from(epic))))
}

/// List epics in a project
#[utoipa::path(
    get,
    path = "/epics",
    tag = "backlog",
    summary = "List epics",
    params(ListEpicsQuery),
    responses(
        (status = 200, description = "Epics ascending by creation time", body = Vec<EpicResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_epics(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListEpicsQuery>,
) -> Result<Json<Vec<EpicResponse>>> {
    let epics = state.store.list_epics(query.project_id).await?;
    Ok(Json(epics.into_iter().map(EpicResponse::from).collect()))
}
