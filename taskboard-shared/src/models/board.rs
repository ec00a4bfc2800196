/// Board model and database operations
///
/// A board is the top-level container: stages, tags, tasks, and access
/// grants all hang off one board. Visibility is driven by grants plus the
/// `public` flag; a public board is readable by any authenticated user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     public BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::board_access::AccessLevel;

/// Stages every new board starts with, in priority order
pub const DEFAULT_STAGE_NAMES: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Board record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Board ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Archived boards are kept but no longer active
    pub archived: bool,

    /// Public boards are readable by any authenticated user
    pub public: bool,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

/// A board row joined with the requester's access level
///
/// `access_level` is `None` when the requester holds no grant (which for
/// a visible row implies the board is public).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BoardWithLevel {
    /// Board ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Public flag
    pub public: bool,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,

    /// The requester's level on this board, if any
    pub access_level: Option<AccessLevel>,
}

/// Input for creating a board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoard {
    /// Display name
    pub name: String,

    /// Description (defaults to empty)
    #[serde(default)]
    pub description: String,

    /// Public flag (defaults to false)
    #[serde(default)]
    pub public: bool,
}

/// Input for updating a board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBoard {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,

    /// New public flag
    pub public: Option<bool>,
}

impl Board {
    /// Creates a board together with its owner grant and default stages
    ///
    /// Runs in a single transaction:
    /// 1. the board row,
    /// 2. an Owner-level grant for `owner_id`,
    /// 3. the default stages ("To Do", "In Progress", "Done").
    ///
    /// Partial failure rolls everything back, so a board can never exist
    /// without an owner able to reach it.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails or the transaction cannot be
    /// committed.
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateBoard,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (name, description, public)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, archived, public, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.public)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO board_access (board_id, user_id, level)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(board.id)
        .bind(owner_id)
        .bind(AccessLevel::Owner)
        .execute(&mut *tx)
        .await?;

        for (priority, name) in DEFAULT_STAGE_NAMES.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stages (board_id, name, priority)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(board.id)
            .bind(name)
            .bind(priority as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(board)
    }

    /// Finds a board by ID without any visibility scoping
    ///
    /// Callers enforcing the API contract should prefer
    /// [`Board::find_visible`].
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, name, description, archived, public, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Finds a board the requester is allowed to see
    ///
    /// Visible means: the requester holds a grant on the board, or the
    /// board is public. A board blocked by this scope is reported exactly
    /// like a missing one.
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<BoardWithLevel>, sqlx::Error> {
        let board = sqlx::query_as::<_, BoardWithLevel>(
            r#"
            SELECT b.id, b.name, b.description, b.archived, b.public,
                   b.created_at, b.updated_at, ba.level AS access_level
            FROM boards b
            LEFT JOIN board_access ba
                   ON ba.board_id = b.id AND ba.user_id = $2
            WHERE b.id = $1 AND (ba.id IS NOT NULL OR b.public)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Lists every board visible to the requester
    ///
    /// Granted boards first by creation date, then public boards the
    /// requester holds no grant on.
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<BoardWithLevel>, sqlx::Error> {
        let boards = sqlx::query_as::<_, BoardWithLevel>(
            r#"
            SELECT b.id, b.name, b.description, b.archived, b.public,
                   b.created_at, b.updated_at, ba.level AS access_level
            FROM boards b
            LEFT JOIN board_access ba
                   ON ba.board_id = b.id AND ba.user_id = $1
            WHERE ba.id IS NOT NULL OR b.public
            ORDER BY (ba.id IS NULL), b.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(boards)
    }

    /// Updates a board
    ///
    /// Only fields present in `data` are written. Returns the updated
    /// board, or `None` if the id is unknown.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE boards SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.archived.is_some() {
            bind_count += 1;
            query.push_str(&format!(", archived = ${}", bind_count));
        }
        if data.public.is_some() {
            bind_count += 1;
            query.push_str(&format!(", public = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, name, description, archived, public, \
             created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Board>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(archived) = data.archived {
            q = q.bind(archived);
        }
        if let Some(public) = data.public {
            q = q.bind(public);
        }

        let board = q.fetch_optional(pool).await?;

        Ok(board)
    }

    /// Deletes a board and, by cascade, its stages, tags, tasks, and grants
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
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
    fn test_default_stages_are_ordered() {
        assert_eq!(DEFAULT_STAGE_NAMES, ["To Do", "In Progress", "Done"]);
    }

    #[test]
    fn test_create_board_defaults() {
        let data: CreateBoard = serde_json::from_str(r#"{"name": "Sprint 12"}"#).unwrap();
        assert_eq!(data.name, "Sprint 12");
        assert_eq!(data.description, "");
        assert!(!data.public);
    }

    #[test]
    fn test_update_board_default_is_noop() {
        let update = UpdateBoard::default();
        assert!(update.name.is_none());
        assert!(update.description.is_none());
        assert!(update.archived.is_none());
        assert!(update.public.is_none());
    }

    // The owner-grant and default-stage side effects are covered by the
    // database-backed tests in taskboard-api/tests/.
}
