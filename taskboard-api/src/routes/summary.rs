/// Home summary endpoint
///
/// A dashboard aggregate: how many of the requester's tasks sit in the
/// three default stages across every board they hold a grant on.
///
/// # Endpoint
///
/// ```text
/// GET /summary
/// ```
///
/// # Response
///
/// ```json
/// { "to_do": 4, "in_progress": 2, "done": 17 }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task::{Task, TaskSummary},
};

/// Summary handler
///
/// Counts each task once, under the exact name of its stage; boards the
/// requester can only see because they are public don't contribute.
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskSummary>> {
    let summary = Task::summary(&state.db, auth.user_id).await?;

    Ok(Json(summary))
}
