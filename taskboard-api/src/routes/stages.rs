/// Stage endpoints
///
/// Stages are a board's ordered columns. The list shape is compact
/// (id, name, priority, tasks); the detail shape carries everything.
/// Reordering goes through the dedicated move endpoint so priorities
/// stay dense.
///
/// # Endpoints
///
/// - `GET /boards/:board_id/stages` - Stages with their tasks
/// - `POST /boards/:board_id/stages` - Create (ReadWrite)
/// - `GET /boards/:board_id/stages/:stage_id` - Full stage
/// - `PATCH /boards/:board_id/stages/:stage_id` - Update (ReadWrite)
/// - `DELETE /boards/:board_id/stages/:stage_id` - Delete (ReadWrite)
/// - `POST /boards/:board_id/stages/:stage_id/move` - Reorder (ReadWrite)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::boards::{TagRef, TaskWithTags},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskboard_shared::{
    auth::{
        access::{require_board_level, require_board_read},
        middleware::AuthContext,
    },
    models::{
        board_access::AccessLevel,
        stage::{CreateStage, Stage, UpdateStage},
        task::Task,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Stage creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStageRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Sort order; appended after existing stages when omitted
    pub priority: Option<i32>,
}

/// Stage update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStageRequest {
    /// New name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,
}

/// Reorder request
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    /// Target position, 0-based; clamped to the sibling count
    pub index: usize,
}

/// Compact stage payload for listings
#[derive(Debug, Serialize, Deserialize)]
pub struct StageListItem {
    /// Stage ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Sort order within the board
    pub priority: i32,

    /// Tasks in priority order, with their tags
    pub tasks: Vec<TaskWithTags>,
}

/// Full stage payload
#[derive(Debug, Serialize, Deserialize)]
pub struct StageDetail {
    /// Stage ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Sort order within the board
    pub priority: i32,

    /// When the stage was created
    pub created_at: DateTime<Utc>,

    /// When the stage was last updated
    pub updated_at: DateTime<Utc>,
}

impl From<Stage> for StageDetail {
    fn from(stage: Stage) -> Self {
        Self {
            id: stage.id,
            board_id: stage.board_id,
            name: stage.name,
            description: stage.description,
            archived: stage.archived,
            priority: stage.priority,
            created_at: stage.created_at,
            updated_at: stage.updated_at,
        }
    }
}

/// Lists a board's stages with their tasks
pub async fn list_stages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<StageListItem>>> {
    require_board_read(&state.db, board_id, auth.user_id).await?;

    let stages = Stage::list_by_board(&state.db, board_id).await?;
    let tasks = Task::list_by_board(&state.db, board_id).await?;

    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut tags_by_task: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for row in Task::tags_for(&state.db, &task_ids).await? {
        tags_by_task.entry(row.task_id).or_default().push(TagRef {
            id: row.id,
            name: row.name,
            color: row.color,
        });
    }

    let mut tasks_by_stage: HashMap<Uuid, Vec<TaskWithTags>> = HashMap::new();
    for task in tasks {
        let tags = tags_by_task.remove(&task.id).unwrap_or_default();
        tasks_by_stage
            .entry(task.stage_id)
            .or_default()
            .push(TaskWithTags {
                id: task.id,
                name: task.name,
                description: task.description,
                body: task.body,
                archived: task.archived,
                priority: task.priority,
                tags,
            });
    }

    let items = stages
        .into_iter()
        .map(|stage| StageListItem {
            tasks: tasks_by_stage.remove(&stage.id).unwrap_or_default(),
            id: stage.id,
            name: stage.name,
            priority: stage.priority,
        })
        .collect();

    Ok(Json(items))
}

/// Creates a stage (ReadWrite)
pub async fn create_stage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateStageRequest>,
) -> ApiResult<(StatusCode, Json<StageDetail>)> {
    req.validate()?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let stage = Stage::create(
        &state.db,
        CreateStage {
            board_id,
            name: req.name,
            description: req.description,
            priority: req.priority,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(stage.into())))
}

/// Returns one stage
pub async fn get_stage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<StageDetail>> {
    let stage = Stage::find_visible(&state.db, stage_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    Ok(Json(stage.into()))
}

/// Updates a stage (ReadWrite)
pub async fn update_stage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateStageRequest>,
) -> ApiResult<Json<StageDetail>> {
    req.validate()?;

    Stage::find_visible(&state.db, stage_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let stage = Stage::update(
        &state.db,
        stage_id,
        UpdateStage {
            name: req.name,
            description: req.description,
            archived: req.archived,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    Ok(Json(stage.into()))
}

/// Deletes a stage and its tasks (ReadWrite)
pub async fn delete_stage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    Stage::find_visible(&state.db, stage_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let deleted = Stage::delete(&state.db, stage_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Stage not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Moves a stage to a new position among its board's stages (ReadWrite)
///
/// Returns the board's stages in their new order.
pub async fn move_stage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Vec<StageDetail>>> {
    Stage::find_visible(&state.db, stage_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let stages = Stage::move_to(&state.db, stage_id, req.index)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    Ok(Json(stages.into_iter().map(Into::into).collect()))
}
