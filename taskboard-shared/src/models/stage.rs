/// Stage model and database operations
///
/// A stage is an ordered column within a board ("To Do", "In Progress",
/// ...). Ordering is a manual sort order kept in the integer `priority`
/// column; drag-and-drop moves renumber the affected siblings via
/// [`Stage::move_to`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE stages (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     priority INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stage record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Stage {
    /// Stage ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Display name
    pub name: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Archived flag
    pub archived: bool,

    /// Manual sort order within the board (ascending)
    pub priority: i32,

    /// When the stage was created
    pub created_at: DateTime<Utc>,

    /// When the stage was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStage {
    /// Owning board
    pub board_id: Uuid,

    /// Display name
    pub name: String,

    /// Description (defaults to empty)
    #[serde(default)]
    pub description: String,

    /// Sort order; when None the stage is appended after its siblings
    pub priority: Option<i32>,
}

/// Input for updating a stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStage {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,
}

impl Stage {
    /// Creates a stage
    ///
    /// Without an explicit priority the stage lands after the board's
    /// current last stage.
    pub async fn create(pool: &PgPool, data: CreateStage) -> Result<Self, sqlx::Error> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            INSERT INTO stages (board_id, name, description, priority)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(priority) + 1, 0)
                              FROM stages WHERE board_id = $1))
            )
            RETURNING id, board_id, name, description, archived, priority,
                      created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.priority)
        .fetch_one(pool)
        .await?;

        Ok(stage)
    }

    /// Finds a stage by ID without visibility scoping
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, board_id, name, description, archived, priority,
                   created_at, updated_at
            FROM stages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(stage)
    }

    /// Finds a stage under a given board that the requester may see
    ///
    /// Scope: the requester holds a grant on the owning board, or the
    /// board is public. A stage outside the scope (or under a different
    /// board than the path says) is reported as missing.
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT s.id, s.board_id, s.name, s.description, s.archived, s.priority,
                   s.created_at, s.updated_at
            FROM stages s
            JOIN boards b ON b.id = s.board_id
            WHERE s.id = $1
              AND s.board_id = $2
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

        Ok(stage)
    }

    /// Lists the stages of a board in priority order
    ///
    /// No scoping; callers must have established visibility of the board.
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, board_id, name, description, archived, priority,
                   created_at, updated_at
            FROM stages
            WHERE board_id = $1
            ORDER BY priority ASC, created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(stages)
    }

    /// Updates a stage
    ///
    /// Returns the updated stage, or `None` if the id is unknown. Sort
    /// order changes go through [`Stage::move_to`] instead.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateStage,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE stages SET updated_at = NOW()");
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

        query.push_str(
            " WHERE id = $1 RETURNING id, board_id, name, description, archived, \
             priority, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Stage>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(archived) = data.archived {
            q = q.bind(archived);
        }

        let stage = q.fetch_optional(pool).await?;

        Ok(stage)
    }

    /// Deletes a stage and, by cascade, its tasks
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves a stage to `target_index` among its board's stages
    ///
    /// Re-reads the siblings in order, re-inserts the moved stage at the
    /// clamped target index, and rewrites the priority of every row whose
    /// position changed. Untouched siblings keep their relative order.
    /// Runs in one transaction with the sibling rows locked.
    ///
    /// Returns the board's stages in their new order, or `None` if the
    /// stage does not exist.
    pub async fn move_to(
        pool: &PgPool,
        id: Uuid,
        target_index: usize,
    ) -> Result<Option<Vec<Self>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board_id: Option<Uuid> =
            sqlx::query_scalar("SELECT board_id FROM stages WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(board_id) = board_id else {
            return Ok(None);
        };

        let mut sibling_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM stages
            WHERE board_id = $1
            ORDER BY priority ASC, created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(board_id)
        .fetch_all(&mut *tx)
        .await?;

        reposition(&mut sibling_ids, id, target_index);

        for (index, sibling_id) in sibling_ids.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE stages
                SET priority = $2, updated_at = NOW()
                WHERE id = $1 AND priority <> $2
                "#,
            )
            .bind(sibling_id)
            .bind(index as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let stages = Self::list_by_board(pool, board_id).await?;
        Ok(Some(stages))
    }
}

/// Moves `id` to `target_index` within `ids`, clamping the index and
/// preserving the relative order of everything else.
pub(crate) fn reposition(ids: &mut Vec<Uuid>, id: Uuid, target_index: usize) {
    if let Some(current) = ids.iter().position(|&x| x == id) {
        ids.remove(current);
        let target = target_index.min(ids.len());
        ids.insert(target, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_reposition_moves_forward() {
        let mut v = ids(4);
        let moved = v[0];
        let rest = vec![v[1], v[2], v[3]];

        reposition(&mut v, moved, 2);

        assert_eq!(v[2], moved);
        // Untouched siblings keep their relative order.
        let others: Vec<Uuid> = v.iter().copied().filter(|x| *x != moved).collect();
        assert_eq!(others, rest);
    }

    #[test]
    fn test_reposition_moves_backward() {
        let mut v = ids(4);
        let moved = v[3];

        reposition(&mut v, moved, 0);

        assert_eq!(v[0], moved);
    }

    #[test]
    fn test_reposition_clamps_out_of_range_index() {
        let mut v = ids(3);
        let moved = v[0];

        reposition(&mut v, moved, 99);

        assert_eq!(*v.last().unwrap(), moved);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_reposition_same_index_is_noop() {
        let mut v = ids(3);
        let snapshot = v.clone();

        let moved = v[1];
        reposition(&mut v, moved, 1);

        assert_eq!(v, snapshot);
    }

    #[test]
    fn test_reposition_unknown_id_is_noop() {
        let mut v = ids(3);
        let snapshot = v.clone();

        reposition(&mut v, Uuid::new_v4(), 0);

        assert_eq!(v, snapshot);
    }
}
