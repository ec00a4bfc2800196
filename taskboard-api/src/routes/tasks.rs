/// Task endpoints
///
/// Tasks are reachable three ways: the flat `/tasks` collection with
/// query filters, and nested under a board or a stage where the path
/// narrows the scope. Create and stage reassignment both check that the
/// stage belongs to the task's board, and tag attachments must come
/// from the same board.
///
/// # Endpoints
///
/// - `GET /tasks` - Visible tasks, filtered by `status` (substring on
///   the stage name), `public`, `archived`
/// - `POST /tasks` - Create (ReadWrite on the target board)
/// - `GET|POST /boards/:board_id/tasks` - Narrowed to one board
/// - `GET|POST /boards/:board_id/stages/:stage_id/tasks` - One stage
/// - `GET|PATCH|DELETE /tasks/:task_id`
/// - `POST /tasks/:task_id/move` - Reorder within the stage

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::boards::TagRef,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use taskboard_shared::{
    auth::{
        access::{require_board_level, require_board_read, require_entity_level},
        middleware::AuthContext,
    },
    models::{
        board_access::AccessLevel,
        stage::Stage,
        tag::Tag,
        task::{CreateTask, Task, TaskFilters, UpdateTask},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Task creation request
///
/// `board_id` and `stage_id` may come from the nested route path
/// instead of the body; the path wins when both are present.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Owning board (required unless in the path)
    pub board_id: Option<Uuid>,

    /// Stage within the board (required unless in the path)
    pub stage_id: Option<Uuid>,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Long-form body
    #[serde(default)]
    pub body: String,

    /// Sort order; appended to the stage when omitted
    pub priority: Option<i32>,

    /// Tags to attach, by id
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

/// Task update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New body
    pub body: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,

    /// Move to another stage on the same board
    pub stage_id: Option<Uuid>,

    /// Replace the attached tag set
    pub tags: Option<Vec<Uuid>>,
}

/// Query filters for task listings
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    /// Case-insensitive substring match on the stage name
    pub status: Option<String>,

    /// Match the owning board's public flag
    pub public: Option<bool>,

    /// Match the archived flag
    pub archived: Option<bool>,
}

/// Reorder request
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    /// Target position, 0-based; clamped to the sibling count
    pub index: usize,
}

/// Task payload with its tags
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Task ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Stage the task sits in
    pub stage_id: Uuid,

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

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    fn new(task: Task, tags: Vec<TagRef>) -> Self {
        Self {
            id: task.id,
            board_id: task.board_id,
            stage_id: task.stage_id,
            name: task.name,
            description: task.description,
            body: task.body,
            archived: task.archived,
            priority: task.priority,
            tags,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Attaches tags to a batch of tasks in one round trip
async fn with_tags(state: &AppState, tasks: Vec<Task>) -> ApiResult<Vec<TaskResponse>> {
    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut tags_by_task: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for row in Task::tags_for(&state.db, &task_ids).await? {
        tags_by_task.entry(row.task_id).or_default().push(TagRef {
            id: row.id,
            name: row.name,
            color: row.color,
        });
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let tags = tags_by_task.remove(&task.id).unwrap_or_default();
            TaskResponse::new(task, tags)
        })
        .collect())
}

/// Loads one task's response payload
async fn task_response(state: &AppState, task: Task) -> ApiResult<TaskResponse> {
    let mut responses = with_tags(state, vec![task]).await?;
    responses
        .pop()
        .ok_or_else(|| ApiError::InternalError("task payload assembly returned nothing".to_string()))
}

/// Checks that a stage exists and sits on the given board
async fn ensure_stage_on_board(state: &AppState, stage_id: Uuid, board_id: Uuid) -> ApiResult<()> {
    let stage = Stage::find_by_id(&state.db, stage_id)
        .await?
        .ok_or_else(|| ApiError::field_error("stage", "Unknown stage"))?;

    if stage.board_id != board_id {
        return Err(ApiError::field_error(
            "stage",
            "Stage does not belong to the task's board",
        ));
    }

    Ok(())
}

/// Checks that every tag id is a live tag on the given board
async fn ensure_tags_on_board(state: &AppState, tags: &[Uuid], board_id: Uuid) -> ApiResult<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let distinct: HashSet<Uuid> = tags.iter().copied().collect();
    let count = Tag::count_live_on_board(&state.db, tags, board_id).await?;

    if count != distinct.len() as i64 {
        return Err(ApiError::field_error(
            "tags",
            "Tags must belong to the task's board",
        ));
    }

    Ok(())
}

/// Shared create path for the flat and nested routes
async fn create_task_impl(
    state: AppState,
    auth: AuthContext,
    board_id: Option<Uuid>,
    stage_id: Option<Uuid>,
    req: CreateTaskRequest,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let board_id = board_id
        .or(req.board_id)
        .ok_or_else(|| ApiError::field_error("board", "Board is required"))?;
    let stage_id = stage_id
        .or(req.stage_id)
        .ok_or_else(|| ApiError::field_error("stage", "Stage is required"))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;
    ensure_stage_on_board(&state, stage_id, board_id).await?;
    ensure_tags_on_board(&state, &req.tags, board_id).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            board_id,
            stage_id,
            name: req.name,
            description: req.description,
            body: req.body,
            priority: req.priority,
            tags: req.tags,
        },
    )
    .await?;

    let response = task_response(&state, task).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Lists every task visible to the requester, filtered
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_visible(
        &state.db,
        auth.user_id,
        &TaskFilters {
            status: query.status,
            public: query.public,
            archived: query.archived,
            ..Default::default()
        },
    )
    .await?;

    with_tags(&state, tasks).await.map(Json)
}

/// Creates a task (ReadWrite on the target board)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    create_task_impl(state, auth, None, None, req).await
}

/// Lists one board's tasks, filtered
pub async fn list_board_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    require_board_read(&state.db, board_id, auth.user_id).await?;

    let tasks = Task::list_visible(
        &state.db,
        auth.user_id,
        &TaskFilters {
            board_id: Some(board_id),
            status: query.status,
            public: query.public,
            archived: query.archived,
            ..Default::default()
        },
    )
    .await?;

    with_tags(&state, tasks).await.map(Json)
}

/// Creates a task on a board named in the path
pub async fn create_board_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    create_task_impl(state, auth, Some(board_id), None, req).await
}

/// Lists one stage's tasks, filtered
pub async fn list_stage_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    Stage::find_visible(&state.db, stage_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stage not found".to_string()))?;

    let tasks = Task::list_visible(
        &state.db,
        auth.user_id,
        &TaskFilters {
            board_id: Some(board_id),
            stage_id: Some(stage_id),
            status: query.status,
            public: query.public,
            archived: query.archived,
        },
    )
    .await?;

    with_tags(&state, tasks).await.map(Json)
}

/// Creates a task on a stage named in the path
pub async fn create_stage_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    create_task_impl(state, auth, Some(board_id), Some(stage_id), req).await
}

/// Returns one task with its tags
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_visible(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    task_response(&state, task).await.map(Json)
}

/// Updates a task (ReadWrite)
///
/// A stage change stays within the board; a tag list replaces the
/// current attachments wholesale.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()?;

    let existing = Task::find_visible(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_entity_level(&state.db, &existing, auth.user_id, AccessLevel::ReadWrite).await?;

    if let Some(stage_id) = req.stage_id {
        ensure_stage_on_board(&state, stage_id, existing.board_id).await?;
    }
    if let Some(ref tags) = req.tags {
        ensure_tags_on_board(&state, tags, existing.board_id).await?;
    }

    let task = Task::update(
        &state.db,
        task_id,
        &UpdateTask {
            name: req.name,
            description: req.description,
            body: req.body,
            archived: req.archived,
            stage_id: req.stage_id,
            tags: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(ref tags) = req.tags {
        Task::set_tags(&state.db, task_id, tags).await?;
    }

    task_response(&state, task).await.map(Json)
}

/// Deletes a task (ReadWrite)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = Task::find_visible(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_entity_level(&state.db, &task, auth.user_id, AccessLevel::ReadWrite).await?;

    let deleted = Task::delete(&state.db, task_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Moves a task to a new position within its stage (ReadWrite)
///
/// Returns the stage's tasks in their new order.
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let task = Task::find_visible(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_entity_level(&state.db, &task, auth.user_id, AccessLevel::ReadWrite).await?;

    let tasks = Task::move_to(&state.db, task_id, req.index)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    with_tags(&state, tasks).await.map(Json)
}
