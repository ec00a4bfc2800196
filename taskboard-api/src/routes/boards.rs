/// Board endpoints
///
/// Listing returns a flat shape with the requester's access level; the
/// detail endpoint returns the whole board: stages in priority order,
/// each with its tasks, each task with its live tags.
///
/// # Endpoints
///
/// - `GET /boards` - Boards visible to the requester
/// - `POST /boards` - Create a board (requester becomes Owner)
/// - `GET /boards/:id` - Full board payload
/// - `PATCH /boards/:id` - Update (Admin)
/// - `DELETE /boards/:id` - Delete (Admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
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
        board::{Board, BoardWithLevel, CreateBoard, UpdateBoard},
        board_access::AccessLevel,
        stage::Stage,
        task::Task,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Board creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Public flag
    #[serde(default)]
    pub public: bool,
}

/// Board update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    /// New name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,

    /// New public flag
    pub public: Option<bool>,
}

/// Flat board payload for listings
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardListItem {
    /// Board ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Public flag
    pub public: bool,

    /// The requester's access level; None on a public board they hold
    /// no grant on
    pub access_level: Option<AccessLevel>,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

impl From<BoardWithLevel> for BoardListItem {
    fn from(board: BoardWithLevel) -> Self {
        Self {
            id: board.id,
            name: board.name,
            description: board.description,
            archived: board.archived,
            public: board.public,
            access_level: board.access_level,
            created_at: board.created_at,
            updated_at: board.updated_at,
        }
    }
}

/// A tag reference on a task payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag ID
    pub id: Uuid,

    /// Tag name
    pub name: String,

    /// Tag color
    pub color: String,
}

/// A task nested under its stage in the board payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskWithTags {
    /// Task ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Long-form body
    pub body: String,

    /// Archived flag
    pub archived: bool,

    /// Sort order within the stage
    pub priority: i32,

    /// Live tags attached to the task
    pub tags: Vec<TagRef>,
}

/// A stage with its tasks in the board payload
#[derive(Debug, Serialize, Deserialize)]
pub struct StageWithTasks {
    /// Stage ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Sort order within the board
    pub priority: i32,

    /// Tasks in priority order
    pub tasks: Vec<TaskWithTags>,
}

/// Full board payload
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardDetail {
    /// Board ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Public flag
    pub public: bool,

    /// The requester's access level, if any
    pub access_level: Option<AccessLevel>,

    /// Stages in priority order, with their tasks and tags
    pub stages: Vec<StageWithTasks>,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

/// Lists every board the requester may see
///
/// Granted boards first, then public boards without a grant.
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<BoardListItem>>> {
    let boards = Board::list_visible(&state.db, auth.user_id).await?;

    Ok(Json(boards.into_iter().map(Into::into).collect()))
}

/// Creates a board
///
/// The requester gets an Owner grant and the board gets the default
/// stages, all in one transaction.
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardListItem>)> {
    req.validate()?;

    let board = Board::create_with_owner(
        &state.db,
        CreateBoard {
            name: req.name,
            description: req.description,
            public: req.public,
        },
        auth.user_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BoardListItem {
            id: board.id,
            name: board.name,
            description: board.description,
            archived: board.archived,
            public: board.public,
            access_level: Some(AccessLevel::Owner),
            created_at: board.created_at,
            updated_at: board.updated_at,
        }),
    ))
}

/// Returns the full board payload
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    let board = require_board_read(&state.db, board_id, auth.user_id).await?;

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

    let stages = stages
        .into_iter()
        .map(|stage| {
            let tasks = tasks_by_stage.remove(&stage.id).unwrap_or_default();
            StageWithTasks {
                id: stage.id,
                name: stage.name,
                description: stage.description,
                archived: stage.archived,
                priority: stage.priority,
                tasks,
            }
        })
        .collect();

    Ok(Json(BoardDetail {
        id: board.id,
        name: board.name,
        description: board.description,
        archived: board.archived,
        public: board.public,
        access_level: board.access_level,
        stages,
        created_at: board.created_at,
        updated_at: board.updated_at,
    }))
}

/// Updates a board (Admin)
pub async fn update_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<BoardListItem>> {
    req.validate()?;

    let scoped = require_board_level(&state.db, board_id, auth.user_id, AccessLevel::Admin).await?;

    let board = Board::update(
        &state.db,
        board_id,
        UpdateBoard {
            name: req.name,
            description: req.description,
            archived: req.archived,
            public: req.public,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    Ok(Json(BoardListItem {
        id: board.id,
        name: board.name,
        description: board.description,
        archived: board.archived,
        public: board.public,
        access_level: scoped.access_level,
        created_at: board.created_at,
        updated_at: board.updated_at,
    }))
}

/// Deletes a board (Admin)
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::Admin).await?;

    let deleted = Board::delete(&state.db, board_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Board not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
