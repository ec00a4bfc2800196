/// Tag model and database operations
///
/// Tags are per-board labels attached to tasks. Deletion is soft: the row
/// stays behind, but the name becomes reusable because the per-board
/// uniqueness index only covers live rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(50) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     color VARCHAR(8) NOT NULL DEFAULT '',
///     deleted BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX unique_tag_name_per_board ON tags(board_id, name)
///     WHERE NOT deleted;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Tag record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Tag ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Display name, unique per board among live tags
    pub name: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Display color, e.g. "#ff8800" (may be empty)
    pub color: String,

    /// Soft-delete flag
    pub deleted: bool,

    /// When the tag was created
    pub created_at: DateTime<Utc>,

    /// When the tag was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTag {
    /// Owning board
    pub board_id: Uuid,

    /// Display name
    pub name: String,

    /// Description (defaults to empty)
    #[serde(default)]
    pub description: String,

    /// Display color (defaults to empty)
    #[serde(default)]
    pub color: String,
}

/// Input for updating a tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTag {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New color
    pub color: Option<String>,
}

impl Tag {
    /// Creates a tag
    ///
    /// # Errors
    ///
    /// Returns an error if a live tag with the same name already exists
    /// on the board (the `unique_tag_name_per_board` index) or on
    /// connection failure.
    pub async fn create(pool: &PgPool, data: CreateTag) -> Result<Self, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (board_id, name, description, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, board_id, name, description, color, deleted,
                      created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.color)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    /// Finds a live tag under a given board that the requester may see
    ///
    /// Same scoping rule as stages: a grant on the owning board or a
    /// public board. Soft-deleted tags are never returned.
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.board_id, t.name, t.description, t.color, t.deleted,
                   t.created_at, t.updated_at
            FROM tags t
            JOIN boards b ON b.id = t.board_id
            WHERE t.id = $1
              AND t.board_id = $2
              AND NOT t.deleted
              AND (b.public OR EXISTS (
                      SELECT 1 FROM board_access ba
                      WHERE ba.board_id = b.id AND ba.user_id = $3))
            "#,
        )
        .bind(id)
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// Lists a board's live tags, oldest first
    ///
    /// No scoping; callers must have established visibility of the board.
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, board_id, name, description, color, deleted,
                   created_at, updated_at
            FROM tags
            WHERE board_id = $1 AND NOT deleted
            ORDER BY created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Updates a live tag
    ///
    /// Returns the updated tag, or `None` if the id is unknown or the tag
    /// was soft-deleted.
    ///
    /// # Errors
    ///
    /// Renaming onto an existing live name on the same board violates the
    /// uniqueness index.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTag,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tags SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.color.is_some() {
            bind_count += 1;
            query.push_str(&format!(", color = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND NOT deleted RETURNING id, board_id, name, description, \
             color, deleted, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Tag>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(color) = data.color {
            q = q.bind(color);
        }

        let tag = q.fetch_optional(pool).await?;

        Ok(tag)
    }

    /// Counts how many of the given ids are live tags on a board
    ///
    /// Used to validate task tag attachments: the count matches the
    /// number of distinct ids exactly when every tag belongs to the
    /// board and none are deleted.
    pub async fn count_live_on_board(
        pool: &PgPool,
        ids: &[Uuid],
        board_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tags
            WHERE id = ANY($1) AND board_id = $2 AND NOT deleted
            "#,
        )
        .bind(ids)
        .bind(board_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Soft-deletes a tag
    ///
    /// The row stays but leaves the uniqueness index, so the name can be
    /// reused. Task attachments are removed so the dead tag stops showing
    /// up on task payloads. Returns true if a live tag was deleted.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE tags
            SET deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM task_tags WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tag_defaults() {
        let data: CreateTag = serde_json::from_str(
            r#"{"board_id": "9f2c7a44-54f4-4499-93a1-9e8a9e4a9f00", "name": "bug"}"#,
        )
        .unwrap();
        assert_eq!(data.name, "bug");
        assert_eq!(data.description, "");
        assert_eq!(data.color, "");
    }

    #[test]
    fn test_update_tag_default_is_noop() {
        let update = UpdateTag::default();
        assert!(update.name.is_none());
        assert!(update.description.is_none());
        assert!(update.color.is_none());
    }

    // Name-uniqueness among live tags (including reuse after delete) is
    // covered by the database-backed tests in taskboard-api/tests/.
}
