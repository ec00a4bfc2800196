/// Database migration runner
///
/// Thin wrapper around sqlx's embedded migration system. Migration files
/// live in `taskboard-shared/migrations/` as `{version}_{name}.up.sql` /
/// `.down.sql` pairs and are compiled into the binary.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::migrations::run_migrations;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Runs all pending database migrations
///
/// Creates the `_sqlx_migrations` bookkeeping table on first use and
/// applies every migration not yet recorded there.
///
/// # Errors
///
/// Returns an error if a migration file fails to apply; sqlx rolls the
/// failing migration back before returning.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
