/// Tag endpoints
///
/// Tags live under a board and attach to its tasks. Deleting one is a
/// soft delete: attachments are dropped and the name becomes free for
/// reuse.
///
/// # Endpoints
///
/// - `GET /boards/:board_id/tags` - Live tags
/// - `POST /boards/:board_id/tags` - Create (ReadWrite)
/// - `GET /boards/:board_id/tags/:tag_id` - One tag
/// - `PATCH /boards/:board_id/tags/:tag_id` - Update (ReadWrite)
/// - `DELETE /boards/:board_id/tags/:tag_id` - Soft delete (ReadWrite)

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
    models::{
        board_access::AccessLevel,
        tag::{CreateTag, Tag, UpdateTag},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Tag creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    /// Display name, unique among the board's live tags
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Display color
    #[serde(default)]
    pub color: String,
}

/// Tag update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTagRequest {
    /// New name
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New color
    pub color: Option<String>,
}

/// Lists a board's live tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Tag>>> {
    require_board_read(&state.db, board_id, auth.user_id).await?;

    let tags = Tag::list_by_board(&state.db, board_id).await?;

    Ok(Json(tags))
}

/// Creates a tag (ReadWrite)
///
/// # Errors
///
/// A duplicate live name on the board is a validation error, surfaced
/// from the `unique_tag_name_per_board` index.
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    req.validate()?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let tag = Tag::create(
        &state.db,
        CreateTag {
            board_id,
            name: req.name,
            description: req.description,
            color: req.color,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(tag)))
}

/// Returns one live tag
pub async fn get_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Tag>> {
    let tag = Tag::find_visible(&state.db, tag_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    Ok(Json(tag))
}

/// Updates a tag (ReadWrite)
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, tag_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTagRequest>,
) -> ApiResult<Json<Tag>> {
    req.validate()?;

    Tag::find_visible(&state.db, tag_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let tag = Tag::update(
        &state.db,
        tag_id,
        UpdateTag {
            name: req.name,
            description: req.description,
            color: req.color,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    Ok(Json(tag))
}

/// Soft-deletes a tag (ReadWrite)
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    Tag::find_visible(&state.db, tag_id, board_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    require_board_level(&state.db, board_id, auth.user_id, AccessLevel::ReadWrite).await?;

    let deleted = Tag::soft_delete(&state.db, tag_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Tag not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
