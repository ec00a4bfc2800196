/// Board access grant endpoints
///
/// Grants tie users to boards with an access level. Reading the grant
/// list needs only read access to the board; every mutation needs an
/// Owner grant.
///
/// # Endpoints
///
/// - `GET /boards/:board_id/access` - List grants
/// - `POST /boards/:board_id/access` - Grant access (Owner)
/// - `GET /boards/:board_id/access/:access_id` - One grant
/// - `PATCH /boards/:board_id/access/:access_id` - Change level (Owner)
/// - `DELETE /boards/:board_id/access/:access_id` - Revoke (Owner)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        access::{require_board_level, require_board_read},
        middleware::AuthContext,
    },
    models::board_access::{AccessLevel, BoardAccess, CreateBoardAccess},
};
use uuid::Uuid;

/// Grant creation request
#[derive(Debug, Deserialize)]
pub struct CreateAccessRequest {
    /// User receiving access
    pub user_id: Uuid,

    /// Level to assign; omitted means ReadWrite
    pub level: Option<AccessLevel>,
}

/// Grant update request
#[derive(Debug, Deserialize)]
pub struct UpdateAccessRequest {
    /// New level
    pub level: AccessLevel,
}

/// Lists a board's grants
pub async fn list_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BoardAccess>>> {
    require_board_read(&state.db, board_id, auth.user_id).await?;

    let grants = BoardAccess::list_by_board(&state.db, board_id).await?;

    Ok(Json(grants))
}

/// Grants a user access to a board (Owner)
///
/// # Errors
///
/// A second grant for the same (board, user) pair is a validation
/// error, surfaced from the `unique_board_access` constraint.
pub async fn create_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateAccessRequest>,
) -> ApiResult<(StatusCode, Json<BoardAccess>)> {
    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::Owner).await?;

    let grant = BoardAccess::create(
        &state.db,
        CreateBoardAccess {
            board_id,
            user_id: req.user_id,
            level: req.level.unwrap_or(AccessLevel::ReadWrite),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Returns one grant
pub async fn get_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, access_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<BoardAccess>> {
    require_board_read(&state.db, board_id, auth.user_id).await?;

    let grant = find_on_board(&state, access_id, board_id).await?;

    Ok(Json(grant))
}

/// Changes the level on a grant (Owner)
pub async fn update_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, access_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateAccessRequest>,
) -> ApiResult<Json<BoardAccess>> {
    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::Owner).await?;

    find_on_board(&state, access_id, board_id).await?;

    let grant = BoardAccess::update_level(&state.db, access_id, req.level)
        .await?
        .ok_or_else(|| ApiError::NotFound("Access grant not found".to_string()))?;

    Ok(Json(grant))
}

/// Revokes a grant (Owner)
pub async fn delete_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, access_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::Owner).await?;

    find_on_board(&state, access_id, board_id).await?;

    let deleted = BoardAccess::delete(&state.db, access_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Access grant not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Fetches a grant and checks it belongs to the board in the path
async fn find_on_board(
    state: &AppState,
    access_id: Uuid,
    board_id: Uuid,
) -> ApiResult<BoardAccess> {
    BoardAccess::find_by_id(&state.db, access_id)
        .await?
        .filter(|grant| grant.board_id == board_id)
        .ok_or_else(|| ApiError::NotFound("Access grant not found".to_string()))
}
