/// User model and database operations
///
/// Users authenticate with username + password and interact with boards
/// through access grants (see `models::board_access`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     avatar VARCHAR(2048),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Avatars
///
/// Avatars are DiceBear URLs. A user created without one gets a
/// deterministic identicon derived from their email; explicitly supplied
/// URLs must point at the DiceBear API host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Required prefix for avatar URLs
pub const AVATAR_URL_PREFIX: &str = "https://avatars.dicebear.com/api/";

/// Validates a user-supplied avatar URL
///
/// # Errors
///
/// Returns a message suitable for a field-level validation error when the
/// URL does not point at the DiceBear API.
pub fn validate_avatar_url(url: &str) -> Result<(), String> {
    if !url.starts_with(AVATAR_URL_PREFIX) {
        return Err("Enter a valid DiceBear avatar url".to_string());
    }
    Ok(())
}

/// Default avatar for a user who didn't pick one
pub fn default_avatar_url(email: &str) -> String {
    format!("{}identicon/{}.svg", AVATAR_URL_PREFIX, email)
}

/// User account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name, unique across all users
    pub username: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Given name (may be empty)
    pub first_name: String,

    /// Family name (may be empty)
    pub last_name: String,

    /// DiceBear avatar URL
    pub avatar: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Avatar URL; when None a DiceBear identicon is derived from the email
    pub avatar: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional; only present fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New given name
    pub first_name: Option<String>,

    /// New family name
    pub last_name: Option<String>,

    /// New avatar URL
    pub avatar: Option<String>,
}

impl User {
    /// Creates a new user
    ///
    /// When `data.avatar` is None, a DiceBear identicon URL derived from
    /// the email is stored instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email already exists (unique
    /// constraint violation) or on connection failure.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let avatar = data
            .avatar
            .unwrap_or_else(|| default_avatar_url(&data.email));

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, first_name, last_name, avatar,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(avatar)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name, avatar,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by login name
    ///
    /// Used by the login endpoint to resolve credentials.
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name, avatar,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only fields present in `data` are written; `updated_at` is bumped.
    /// Returns the updated user, or `None` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if a new email collides with another user or on
    /// connection failure.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Assemble the SET clause from the present fields.
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if data.avatar.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, username, email, password_hash, first_name, \
             last_name, avatar, created_at, updated_at, last_login_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(avatar) = data.avatar {
            q = q.bind(avatar);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user account
    ///
    /// Grants and tokens are removed by cascade. Returns true if a row
    /// was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_avatar_url() {
        assert!(validate_avatar_url("https://avatars.dicebear.com/api/identicon/x.svg").is_ok());
        assert!(validate_avatar_url("https://example.com/avatar.png").is_err());
        assert!(validate_avatar_url("").is_err());
    }

    #[test]
    fn test_default_avatar_derived_from_email() {
        let url = default_avatar_url("jane@example.com");
        assert_eq!(
            url,
            "https://avatars.dicebear.com/api/identicon/jane@example.com.svg"
        );
        assert!(validate_avatar_url(&url).is_ok());
    }

    #[test]
    fn test_update_user_default_is_noop() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
        assert!(update.first_name.is_none());
        assert!(update.last_name.is_none());
        assert!(update.avatar.is_none());
    }

    // Database operations are covered by the integration tests in
    // taskboard-api/tests/.
}
