/// Authentication middleware for Axum
///
/// Extracts the bearer token from the Authorization header, resolves it
/// against the `auth_tokens` table, and adds an [`AuthContext`] to the
/// request extensions for handlers to pick up.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use sqlx::PgPool;
/// use taskboard_shared::auth::middleware::{bearer_auth_middleware, AuthContext};
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// fn router(pool: PgPool) -> Router {
///     Router::new()
///         .route("/protected", get(handler))
///         .layer(middleware::from_fn(move |req, next| {
///             bearer_auth_middleware(pool.clone(), req, next)
///         }))
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::token::AuthToken;

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing Authorization header
    MissingCredentials,

    /// Invalid Authorization header format
    InvalidFormat(String),

    /// Token is unknown or revoked
    InvalidToken,

    /// Database error
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Same JSON envelope the API's error type produces.
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or revoked token".to_string(),
            ),
            AuthError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Extracts a bearer token from an Authorization header value
///
/// Accepts both `Bearer <token>` and the `Token <token>` form older
/// clients send.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("Token "))
}

/// Bearer token authentication middleware
///
/// Validates tokens against the database and rejects the request with
/// 401 when the header is missing or the token is unknown.
pub async fn bearer_auth_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = extract_bearer_token(auth_header)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let user_id = AuthToken::authenticate(&pool, token)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or(AuthError::InvalidToken)?;

    req.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Token abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("abc123"), None);
    }
}
