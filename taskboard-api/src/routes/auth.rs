/// Authentication endpoints
///
/// Login exchanges credentials for an opaque bearer token; logout
/// revokes the token presented in the Authorization header.
///
/// # Endpoints
///
/// - `POST /auth/login` - Login and get a token
/// - `DELETE /auth/logout` - Revoke the presented token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        middleware::extract_bearer_token,
        password,
        token::AuthToken,
    },
    models::user::User,
};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login name
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer token for subsequent requests
    pub token: String,
}

/// Login endpoint
///
/// Verifies the credentials, records the login time, and issues a fresh
/// token. Earlier tokens stay valid, so each client session gets its
/// own.
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "username": "jane",
///   "password": "hunter2hunter2"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "kq3X..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown username or wrong password (the two
///   are indistinguishable)
/// - `422 Unprocessable Entity`: Missing fields
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    User::update_last_login(&state.db, user.id).await?;

    let (_, token) = AuthToken::issue(&state.db, user.id).await?;

    Ok(Json(LoginResponse { token }))
}

/// Logout endpoint
///
/// Revokes the token carried in the Authorization header. A request
/// without one is malformed (400) rather than silently accepted.
///
/// # Endpoint
///
/// ```text
/// DELETE /auth/logout
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// `204 No Content` on success.
///
/// # Errors
///
/// - `400 Bad Request`: No token presented
/// - `401 Unauthorized`: Token is unknown or already revoked
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::BadRequest("No token presented".to_string()))?;

    let revoked = AuthToken::revoke(&state.db, token).await?;
    if !revoked {
        return Err(ApiError::Unauthorized(
            "Invalid or revoked token".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
