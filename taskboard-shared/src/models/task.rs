/// Task model and database operations
///
/// A task lives on one board, in one stage of that board, and may carry
/// any number of the board's tags. Like stages, tasks keep a manual sort
/// order in `priority`, renumbered by [`Task::move_to`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     stage_id UUID NOT NULL REFERENCES stages(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     body TEXT NOT NULL DEFAULT '',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     priority INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_tags (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, tag_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::stage::reposition;

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Task ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Stage the task currently sits in; must belong to the same board
    pub stage_id: Uuid,

    /// Display name
    pub name: String,

    /// Short description (may be empty)
    pub description: String,

    /// Long-form body, e.g. markdown (may be empty)
    pub body: String,

    /// Archived flag
    pub archived: bool,

    /// Manual sort order within the stage (ascending)
    pub priority: i32,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// A tag attachment, joined for task payloads
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskTagRow {
    /// Task the tag is attached to
    pub task_id: Uuid,

    /// Tag ID
    pub id: Uuid,

    /// Tag name
    pub name: String,

    /// Tag color
    pub color: String,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Owning board
    pub board_id: Uuid,

    /// Stage within the board
    pub stage_id: Uuid,

    /// Display name
    pub name: String,

    /// Description (defaults to empty)
    #[serde(default)]
    pub description: String,

    /// Body (defaults to empty)
    #[serde(default)]
    pub body: String,

    /// Sort order; when None the task is appended at the end of its stage
    pub priority: Option<i32>,

    /// Tags to attach, by id
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

/// Input for updating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New body
    pub body: Option<String>,

    /// New archived flag
    pub archived: Option<bool>,

    /// Move to another stage (must belong to the same board)
    pub stage_id: Option<Uuid>,

    /// Replace the attached tag set
    pub tags: Option<Vec<Uuid>>,
}

/// Filters for task listing
///
/// `board_id` and `stage_id` come from nested route paths; the rest from
/// query parameters.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    /// Narrow to one board
    pub board_id: Option<Uuid>,

    /// Narrow to one stage
    pub stage_id: Option<Uuid>,

    /// Case-insensitive substring match on the stage name
    pub status: Option<String>,

    /// Match the owning board's public flag
    pub public: Option<bool>,

    /// Match the archived flag
    pub archived: Option<bool>,
}

/// Counts of the requester's tasks in the three default stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Tasks in a "To Do" stage
    pub to_do: i64,

    /// Tasks in an "In Progress" stage
    pub in_progress: i64,

    /// Tasks in a "Done" stage
    pub done: i64,
}

/// Escapes LIKE/ILIKE wildcards so user input matches literally
///
/// Postgres treats backslash as the escape character inside a pattern,
/// so it must be doubled before `%` and `_` are escaped.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Task {
    /// Creates a task and attaches its tags in one transaction
    ///
    /// Without an explicit priority the task is appended after its stage
    /// siblings. Callers must have validated that `stage_id` (and every
    /// tag) belongs to `board_id`.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (board_id, stage_id, name, description, body, priority)
            VALUES (
                $1, $2, $3, $4, $5,
                COALESCE($6, (SELECT COALESCE(MAX(priority) + 1, 0)
                              FROM tasks WHERE stage_id = $2))
            )
            RETURNING id, board_id, stage_id, name, description, body, archived,
                      priority, created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.stage_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.body)
        .bind(data.priority)
        .fetch_one(&mut *tx)
        .await?;

        for tag_id in &data.tags {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(task.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(task)
    }

    /// Finds a task by ID without visibility scoping
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, board_id, stage_id, name, description, body, archived,
                   priority, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task the requester may see
    ///
    /// Scope: a grant on the owning board or a public board. A task
    /// outside that scope is reported as missing.
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.board_id, t.stage_id, t.name, t.description, t.body,
                   t.archived, t.priority, t.created_at, t.updated_at
            FROM tasks t
            JOIN boards b ON b.id = t.board_id
            WHERE t.id = $1
              AND (b.public OR EXISTS (
                      SELECT 1 FROM board_access ba
                      WHERE ba.board_id = b.id AND ba.user_id = $2))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks visible to the requester, filtered
    ///
    /// Visible rows are those on granted or public boards; `filters`
    /// narrows further. The status filter is a substring match on the
    /// stage name with `%` and `_` taken literally. Ordered by stage
    /// priority, then task priority.
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        filters: &TaskFilters,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.board_id, t.stage_id, t.name, t.description, t.body,
                   t.archived, t.priority, t.created_at, t.updated_at
            FROM tasks t
            JOIN boards b ON b.id = t.board_id
            JOIN stages s ON s.id = t.stage_id
            WHERE (b.public OR EXISTS (
                      SELECT 1 FROM board_access ba
                      WHERE ba.board_id = b.id AND ba.user_id = $1))
              AND ($2::uuid IS NULL OR t.board_id = $2)
              AND ($3::uuid IS NULL OR t.stage_id = $3)
              AND ($4::text IS NULL OR s.name ILIKE '%' || $4 || '%')
              AND ($5::boolean IS NULL OR b.public = $5)
              AND ($6::boolean IS NULL OR t.archived = $6)
            ORDER BY s.priority ASC, t.priority ASC, t.created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(filters.board_id)
        .bind(filters.stage_id)
        .bind(filters.status.as_deref().map(escape_like))
        .bind(filters.public)
        .bind(filters.archived)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists a board's tasks in stage-then-priority order
    ///
    /// No scoping; used to assemble the full board payload after the board
    /// itself passed the visibility check.
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.board_id, t.stage_id, t.name, t.description, t.body,
                   t.archived, t.priority, t.created_at, t.updated_at
            FROM tasks t
            JOIN stages s ON s.id = t.stage_id
            WHERE t.board_id = $1
            ORDER BY s.priority ASC, t.priority ASC, t.created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Fetches the live tag attachments for a set of tasks
    ///
    /// One round trip for a whole listing; group the rows by `task_id`.
    pub async fn tags_for(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<Vec<TaskTagRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TaskTagRow>(
            r#"
            SELECT tt.task_id, g.id, g.name, g.color
            FROM task_tags tt
            JOIN tags g ON g.id = tt.tag_id
            WHERE tt.task_id = ANY($1) AND NOT g.deleted
            ORDER BY g.created_at ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Replaces a task's tag set
    ///
    /// Callers must have validated that every tag belongs to the task's
    /// board.
    pub async fn set_tags(
        pool: &PgPool,
        task_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        for tag_id in tag_ids {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(task_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Updates a task's scalar fields
    ///
    /// Tag changes go through [`Task::set_tags`]; sort order changes
    /// through [`Task::move_to`]. Returns the updated task, or `None` if
    /// the id is unknown.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.body.is_some() {
            bind_count += 1;
            query.push_str(&format!(", body = ${}", bind_count));
        }
        if data.archived.is_some() {
            bind_count += 1;
            query.push_str(&format!(", archived = ${}", bind_count));
        }
        if data.stage_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", stage_id = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, board_id, stage_id, name, description, body, \
             archived, priority, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(ref name) = data.name {
            q = q.bind(name);
        }
        if let Some(ref description) = data.description {
            q = q.bind(description);
        }
        if let Some(ref body) = data.body {
            q = q.bind(body);
        }
        if let Some(archived) = data.archived {
            q = q.bind(archived);
        }
        if let Some(stage_id) = data.stage_id {
            q = q.bind(stage_id);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves a task to `target_index` among its stage's tasks
    ///
    /// Same renumbering discipline as [`super::stage::Stage::move_to`]:
    /// siblings are locked, the moved task is re-inserted at the clamped
    /// index, and only rows whose position changed are rewritten.
    ///
    /// Returns the stage's tasks in their new order, or `None` if the
    /// task does not exist.
    pub async fn move_to(
        pool: &PgPool,
        id: Uuid,
        target_index: usize,
    ) -> Result<Option<Vec<Self>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let stage_id: Option<Uuid> = sqlx::query_scalar("SELECT stage_id FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(stage_id) = stage_id else {
            return Ok(None);
        };

        let mut sibling_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM tasks
            WHERE stage_id = $1
            ORDER BY priority ASC, created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(stage_id)
        .fetch_all(&mut *tx)
        .await?;

        reposition(&mut sibling_ids, id, target_index);

        for (index, sibling_id) in sibling_ids.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE tasks
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

        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, board_id, stage_id, name, description, body, archived,
                   priority, created_at, updated_at
            FROM tasks
            WHERE stage_id = $1
            ORDER BY priority ASC, created_at ASC
            "#,
        )
        .bind(stage_id)
        .fetch_all(pool)
        .await?;

        Ok(Some(tasks))
    }

    /// Counts the requester's tasks in the "To Do" / "In Progress" /
    /// "Done" stages across every board they hold a grant on
    ///
    /// Each task is counted once, under the exact name of its stage;
    /// stages with other names don't contribute. Public boards without a
    /// grant are not included.
    pub async fn summary(pool: &PgPool, user_id: Uuid) -> Result<TaskSummary, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT s.name, COUNT(*)
            FROM tasks t
            JOIN stages s ON s.id = t.stage_id
            JOIN board_access ba ON ba.board_id = t.board_id AND ba.user_id = $1
            WHERE s.name IN ('To Do', 'In Progress', 'Done')
            GROUP BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut summary = TaskSummary::default();
        for (name, count) in rows {
            match name.as_str() {
                "To Do" => summary.to_do = count,
                "In Progress" => summary.in_progress = count,
                "Done" => summary.done = count,
                _ => {}
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_task_defaults() {
        let data: CreateTask = serde_json::from_str(
            r#"{
                "board_id": "9f2c7a44-54f4-4499-93a1-9e8a9e4a9f00",
                "stage_id": "52b6d4fa-0a5e-4e09-a9f6-2f2ea24b06a8",
                "name": "Ship it"
            }"#,
        )
        .unwrap();
        assert_eq!(data.name, "Ship it");
        assert_eq!(data.description, "");
        assert_eq!(data.body, "");
        assert!(data.priority.is_none());
        assert!(data.tags.is_empty());
    }

    #[test]
    fn test_task_filters_default_is_unfiltered() {
        let filters = TaskFilters::default();
        assert!(filters.board_id.is_none());
        assert!(filters.stage_id.is_none());
        assert!(filters.status.is_none());
        assert!(filters.public.is_none());
        assert!(filters.archived.is_none());
    }

    #[test]
    fn test_escape_like_makes_wildcards_literal() {
        assert_eq!(escape_like("To Do"), "To Do");
        assert_eq!(escape_like("50% done"), "50\\% done");
        assert_eq!(escape_like("in_progress"), "in\\_progress");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_summary_serialization_shape() {
        let summary = TaskSummary {
            to_do: 2,
            in_progress: 1,
            done: 4,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["to_do"], 2);
        assert_eq!(json["in_progress"], 1);
        assert_eq!(json["done"], 4);
    }

    // Filtering, tag attachment, and summary counting against real data
    // are covered by the database-backed tests in taskboard-api/tests/.
}
