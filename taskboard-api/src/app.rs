/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::middleware::bearer_auth_middleware;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Liveness probe (public)
/// ├── /auth/
/// │   ├── POST   /login                # Credentials → bearer token (public)
/// │   └── DELETE /logout               # Revoke the presented token
/// ├── POST /users                      # Registration (public)
/// ├── /users/
/// │   ├── GET|PATCH|DELETE /me
/// │   └── GET /:id
/// ├── /boards/                         # All authenticated
/// │   ├── GET|POST /
/// │   ├── GET|PATCH|DELETE /:board_id
/// │   ├── /:board_id/access[/:access_id]
/// │   ├── /:board_id/stages[/:stage_id], POST .../:stage_id/move
/// │   ├── /:board_id/tags[/:tag_id]
/// │   └── /:board_id/tasks, /:board_id/stages/:stage_id/tasks
/// ├── /tasks[/:task_id], POST /tasks/:task_id/move
/// └── GET /summary
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer, permissive only behind the config flag)
/// 3. Bearer token authentication (everything except health, login,
///    logout, and registration)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Public routes: liveness, login, registration. Logout lives here
    // too so a request without any token gets a 400 from the handler
    // instead of the middleware's 401.
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", delete(routes::auth::logout))
        .route("/users", post(routes::users::register));

    let user_routes = Router::new()
        .route(
            "/me",
            get(routes::users::get_me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route("/:user_id", get(routes::users::get_user));

    let board_routes = Router::new()
        .route(
            "/",
            get(routes::boards::list_boards).post(routes::boards::create_board),
        )
        .route(
            "/:board_id",
            get(routes::boards::get_board)
                .patch(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        )
        .route(
            "/:board_id/access",
            get(routes::board_access::list_access).post(routes::board_access::create_access),
        )
        .route(
            "/:board_id/access/:access_id",
            get(routes::board_access::get_access)
                .patch(routes::board_access::update_access)
                .delete(routes::board_access::delete_access),
        )
        .route(
            "/:board_id/stages",
            get(routes::stages::list_stages).post(routes::stages::create_stage),
        )
        .route(
            "/:board_id/stages/:stage_id",
            get(routes::stages::get_stage)
                .patch(routes::stages::update_stage)
                .delete(routes::stages::delete_stage),
        )
        .route(
            "/:board_id/stages/:stage_id/move",
            post(routes::stages::move_stage),
        )
        .route(
            "/:board_id/stages/:stage_id/tasks",
            get(routes::tasks::list_stage_tasks).post(routes::tasks::create_stage_task),
        )
        .route(
            "/:board_id/tags",
            get(routes::tags::list_tags).post(routes::tags::create_tag),
        )
        .route(
            "/:board_id/tags/:tag_id",
            get(routes::tags::get_tag)
                .patch(routes::tags::update_tag)
                .delete(routes::tags::delete_tag),
        )
        .route(
            "/:board_id/tasks",
            get(routes::tasks::list_board_tasks).post(routes::tasks::create_board_task),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:task_id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:task_id/move", post(routes::tasks::move_task));

    // Everything below requires a valid bearer token.
    let pool = state.db.clone();
    let authenticated_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/boards", board_routes)
        .nest("/tasks", task_routes)
        .route("/summary", get(routes::summary::get_summary))
        .layer(axum::middleware::from_fn(move |req, next| {
            bearer_auth_middleware(pool.clone(), req, next)
        }));

    let cors = build_cors(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Builds the CORS layer from configuration
///
/// Permissive CORS is a deploy-time switch (`TASKBOARD_PERMISSIVE_CORS`)
/// meant for local development; production deployments list explicit
/// origins instead.
fn build_cors(config: &Config) -> CorsLayer {
    if config.api.permissive_cors {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}
