/// Board access grants and the access-level policy
///
/// A `BoardAccess` row grants one user one access level on one board.
/// This is the single source of truth for authorization decisions: every
/// permission check resolves the requester's grant on the owning board
/// and compares it against a threshold.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE board_access (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     level INTEGER NOT NULL DEFAULT 1000,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT unique_board_access UNIQUE (board_id, user_id)
/// );
/// ```
///
/// # Levels
///
/// Levels are stored as integers with deliberate gaps; a LOWER value is
/// MORE privileged, so "at least as privileged as" reads `level <= threshold`.
///
/// - **Owner** (0): full control, including managing access grants
/// - **Admin** (100): can mutate the board itself
/// - **ReadWrite** (1000): can mutate stages, tags, and tasks
/// - **ReadOnly** (2000): read-only access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Ordered privilege tier for a board grant
///
/// Serialized (JSON and SQL) as its numeric value, so clients sort and
/// compare levels the same way the server does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(into = "i32", try_from = "i32")]
pub enum AccessLevel {
    /// Full control over the board and its grants
    Owner = 0,

    /// Can mutate the board itself
    Admin = 100,

    /// Can mutate stages, tags, and tasks
    ReadWrite = 1000,

    /// Read-only access
    ReadOnly = 2000,
}

impl AccessLevel {
    /// Whether this level is at least as privileged as `threshold`
    ///
    /// Lower numeric value = more privilege, so this is `self <= threshold`
    /// on the stored integers. An `Owner` satisfies every threshold; a
    /// `ReadOnly` grant satisfies only `ReadOnly`.
    pub fn satisfies(self, threshold: AccessLevel) -> bool {
        (self as i32) <= (threshold as i32)
    }

    /// Human-readable name, used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Owner => "owner",
            AccessLevel::Admin => "admin",
            AccessLevel::ReadWrite => "read-write",
            AccessLevel::ReadOnly => "read-only",
        }
    }
}

impl From<AccessLevel> for i32 {
    fn from(level: AccessLevel) -> i32 {
        level as i32
    }
}

impl TryFrom<i32> for AccessLevel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessLevel::Owner),
            100 => Ok(AccessLevel::Admin),
            1000 => Ok(AccessLevel::ReadWrite),
            2000 => Ok(AccessLevel::ReadOnly),
            other => Err(format!("unknown access level: {}", other)),
        }
    }
}

/// A user's access grant on a board
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardAccess {
    /// Grant ID
    pub id: Uuid,

    /// Board the grant applies to
    pub board_id: Uuid,

    /// User receiving access
    pub user_id: Uuid,

    /// Granted level
    pub level: AccessLevel,

    /// When the grant was created
    pub created_at: DateTime<Utc>,

    /// When the grant was last changed
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoardAccess {
    /// Board ID
    pub board_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Level to assign (defaults to ReadWrite)
    #[serde(default = "default_level")]
    pub level: AccessLevel,
}

fn default_level() -> AccessLevel {
    AccessLevel::ReadWrite
}

impl BoardAccess {
    /// Creates a new access grant
    ///
    /// # Errors
    ///
    /// Returns an error if the (board, user) pair already has a grant
    /// (the `unique_board_access` constraint), if board or user do not
    /// exist, or on connection failure.
    pub async fn create(pool: &PgPool, data: CreateBoardAccess) -> Result<Self, sqlx::Error> {
        let access = sqlx::query_as::<_, BoardAccess>(
            r#"
            INSERT INTO board_access (board_id, user_id, level)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, user_id, level, created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.user_id)
        .bind(data.level)
        .fetch_one(pool)
        .await?;

        Ok(access)
    }

    /// Finds a grant by its own ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let access = sqlx::query_as::<_, BoardAccess>(
            r#"
            SELECT id, board_id, user_id, level, created_at, updated_at
            FROM board_access
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(access)
    }

    /// Changes the level on an existing grant
    ///
    /// Returns the updated grant, or `None` if the grant does not exist.
    pub async fn update_level(
        pool: &PgPool,
        id: Uuid,
        level: AccessLevel,
    ) -> Result<Option<Self>, sqlx::Error> {
        let access = sqlx::query_as::<_, BoardAccess>(
            r#"
            UPDATE board_access
            SET level = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, user_id, level, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(level)
        .fetch_optional(pool)
        .await?;

        Ok(access)
    }

    /// Revokes a grant
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM board_access WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all grants on a board, oldest first
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let grants = sqlx::query_as::<_, BoardAccess>(
            r#"
            SELECT id, board_id, user_id, level, created_at, updated_at
            FROM board_access
            WHERE board_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_numeric_values() {
        assert_eq!(i32::from(AccessLevel::Owner), 0);
        assert_eq!(i32::from(AccessLevel::Admin), 100);
        assert_eq!(i32::from(AccessLevel::ReadWrite), 1000);
        assert_eq!(i32::from(AccessLevel::ReadOnly), 2000);
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            AccessLevel::Owner,
            AccessLevel::Admin,
            AccessLevel::ReadWrite,
            AccessLevel::ReadOnly,
        ] {
            assert_eq!(AccessLevel::try_from(i32::from(level)), Ok(level));
        }

        assert!(AccessLevel::try_from(42).is_err());
    }

    #[test]
    fn test_satisfies_is_monotonic() {
        let thresholds = [
            AccessLevel::Owner,
            AccessLevel::Admin,
            AccessLevel::ReadWrite,
            AccessLevel::ReadOnly,
        ];

        // Owner passes every threshold check.
        for t in thresholds {
            assert!(AccessLevel::Owner.satisfies(t));
        }

        // ReadOnly fails anything stronger than ReadOnly.
        assert!(AccessLevel::ReadOnly.satisfies(AccessLevel::ReadOnly));
        assert!(!AccessLevel::ReadOnly.satisfies(AccessLevel::ReadWrite));
        assert!(!AccessLevel::ReadOnly.satisfies(AccessLevel::Admin));
        assert!(!AccessLevel::ReadOnly.satisfies(AccessLevel::Owner));

        // Admin sits between Owner and ReadWrite.
        assert!(AccessLevel::Admin.satisfies(AccessLevel::ReadWrite));
        assert!(!AccessLevel::Admin.satisfies(AccessLevel::Owner));
    }

    #[test]
    fn test_create_board_access_default_level() {
        assert_eq!(default_level(), AccessLevel::ReadWrite);
    }

    #[test]
    fn test_level_serializes_as_integer() {
        let json = serde_json::to_string(&AccessLevel::Admin).unwrap();
        assert_eq!(json, "100");

        let level: AccessLevel = serde_json::from_str("2000").unwrap();
        assert_eq!(level, AccessLevel::ReadOnly);
    }

    // Grant uniqueness and cascade behavior are covered by the
    // database-backed tests in taskboard-api/tests/.
}
