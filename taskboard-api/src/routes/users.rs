/// User account endpoints
///
/// Registration is open; everything else operates on the authenticated
/// user. Other accounts are readable by id but never writable.
///
/// # Endpoints
///
/// - `POST /users` - Register (no auth)
/// - `GET /users/me` - Current user's profile
/// - `PATCH /users/me` - Update the current user
/// - `DELETE /users/me` - Delete the current user
/// - `GET /users/:id` - Read another user's profile

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
use taskboard_shared::{
    auth::{middleware::AuthContext, password, token::AuthToken},
    models::user::{validate_avatar_url, CreateUser, UpdateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password, hashed before storage
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Given name
    #[serde(default)]
    pub first_name: String,

    /// Family name
    #[serde(default)]
    pub last_name: String,

    /// DiceBear avatar URL; derived from the email when omitted
    pub avatar: Option<String>,
}

/// Profile update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New plaintext password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    /// New given name
    pub first_name: Option<String>,

    /// New family name
    pub last_name: Option<String>,

    /// New avatar URL
    pub avatar: Option<String>,
}

/// User payload, without the password hash
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    /// User ID
    pub id: Uuid,

    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// DiceBear avatar URL
    pub avatar: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the user last logged in
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar: user.avatar,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Registration endpoint
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// {
///   "username": "jane",
///   "email": "jane@example.com",
///   "password": "hunter2hunter2"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already taken
/// - `422 Unprocessable Entity`: Validation failed (including a
///   non-DiceBear avatar URL)
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    if let Some(ref avatar) = req.avatar {
        validate_avatar_url(avatar).map_err(|msg| ApiError::field_error("avatar", msg))?;
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            avatar: req.avatar,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Returns the authenticated user's profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Updates the authenticated user's profile
///
/// Only present fields are written. A password change is re-hashed and
/// revokes every outstanding token, so other sessions must log in again.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    if let Some(ref avatar) = req.avatar {
        validate_avatar_url(avatar).map_err(|msg| ApiError::field_error("avatar", msg))?;
    }

    let password_hash = match req.password {
        Some(ref password) => Some(password::hash_password(password)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            avatar: req.avatar,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if req.password.is_some() {
        AuthToken::revoke_all(&state.db, auth.user_id).await?;
    }

    Ok(Json(user.into()))
}

/// Deletes the authenticated user's account
///
/// Tokens and board grants go with it by cascade.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    let deleted = User::delete(&state.db, auth.user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Reads another user's profile by id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
