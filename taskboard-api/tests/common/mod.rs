/// Common test utilities for integration tests
///
/// Shared infrastructure: test database setup, user creation, bearer
/// tokens, and request helpers. Tests that use [`TestContext`] need a
/// running PostgreSQL instance reachable through `DATABASE_URL` and are
/// marked `#[ignore]` so the default test run stays self-contained.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::token::AuthToken;
use taskboard_shared::models::board::{Board, CreateBoard};
use taskboard_shared::models::user::{CreateUser, User};
use tower::ServiceExt;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub user: User,
    pub token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh primary user
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../taskboard-shared/migrations")
            .run(&db)
            .await?;

        let (user, token) = create_test_user(&db).await?;

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            user,
            token,
        })
    }

    /// Cleans up test data
    ///
    /// Deleting the user cascades to their tokens and grants. Boards
    /// stay behind; the suite targets a disposable database.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Creates a user directly in the database and issues a token
pub async fn create_test_user(db: &PgPool) -> anyhow::Result<(User, String)> {
    let suffix = Uuid::new_v4();

    let password_hash =
        taskboard_shared::auth::password::hash_password("test-password-123")?;

    let user = User::create(
        db,
        CreateUser {
            username: format!("test-{}", suffix),
            email: format!("test-{}@example.com", suffix),
            password_hash,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            avatar: None,
        },
    )
    .await?;

    let (_, token) = AuthToken::issue(db, user.id).await?;

    Ok((user, token))
}

/// Creates a board owned by the given user, with the default stages
pub async fn create_test_board(
    ctx: &TestContext,
    name: &str,
    public: bool,
) -> anyhow::Result<Board> {
    let board = Board::create_with_owner(
        &ctx.db,
        CreateBoard {
            name: name.to_string(),
            description: String::new(),
            public,
        },
        ctx.user.id,
    )
    .await?;

    Ok(board)
}

/// Sends a request and returns the status plus the parsed JSON body
///
/// Empty bodies (e.g. 204 responses) come back as `Value::Null`.
pub async fn send(
    app: &axum::Router,
    request: Request<Body>,
) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    Ok((status, json))
}

/// Builds a JSON request with a bearer token
pub fn authed_json(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Builds a JSON request without credentials
pub fn anon_json(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
