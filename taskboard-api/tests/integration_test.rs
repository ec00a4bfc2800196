/// Integration tests for the taskboard API
///
/// These exercise the full stack: router, auth middleware, access
/// checks, and the database. They need a running PostgreSQL instance
/// behind `DATABASE_URL` and are therefore `#[ignore]`d; run them with
/// `cargo test -- --ignored` against a disposable database.

mod common;

use axum::http::StatusCode;
use common::{anon_json, authed_json, create_test_board, create_test_user, send, TestContext};
use serde_json::json;
use taskboard_shared::models::board_access::{AccessLevel, BoardAccess};
use taskboard_shared::models::stage::Stage;

/// Registration, login, and profile round trip
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_register_login_me_flow() {
    let ctx = TestContext::new().await.unwrap();
    let username = format!("flow-{}", uuid::Uuid::new_v4());

    let (status, body) = send(
        &ctx.app,
        anon_json(
            "POST",
            "/users",
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "hunter2hunter2"
            })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED, "register: {}", body);
    assert!(body["avatar"]
        .as_str()
        .unwrap()
        .starts_with("https://avatars.dicebear.com/api/"));

    let (status, body) = send(
        &ctx.app,
        anon_json(
            "POST",
            "/auth/login",
            Some(json!({ "username": username, "password": "hunter2hunter2" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK, "login: {}", body);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&ctx.app, authed_json("GET", "/users/me", &token, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], username.as_str());
    assert!(body.get("password_hash").is_none());

    // Wrong password is a 401, indistinguishable from an unknown user.
    let (status, _) = send(
        &ctx.app,
        anon_json(
            "POST",
            "/auth/login",
            Some(json!({ "username": username, "password": "wrong-password" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

/// Logout without a token is a client error, not a silent no-op
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_logout_requires_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = send(&ctx.app, anon_json("DELETE", "/auth/logout", None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // With the token: revokes it, and the token stops working.
    let (status, _) = send(
        &ctx.app,
        authed_json("DELETE", "/auth/logout", &ctx.token, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&ctx.app, authed_json("GET", "/users/me", &ctx.token, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

/// Board creation yields exactly one Owner grant and the default stages
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_board_creation_side_effects() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = send(
        &ctx.app,
        authed_json(
            "POST",
            "/boards",
            &ctx.token,
            Some(json!({ "name": "Sprint 1" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED, "create board: {}", body);
    assert_eq!(body["access_level"], 0); // Owner serializes as its integer

    let board_id: uuid::Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let grants = BoardAccess::list_by_board(&ctx.db, board_id).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].user_id, ctx.user.id);
    assert_eq!(grants[0].level, AccessLevel::Owner);

    let stages = Stage::list_by_board(&ctx.db, board_id).await.unwrap();
    let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["To Do", "In Progress", "Done"]);
    let priorities: Vec<i32> = stages.iter().map(|s| s.priority).collect();
    assert_eq!(priorities, [0, 1, 2]);

    ctx.cleanup().await.unwrap();
}

/// Private boards are invisible without a grant; public boards are
/// readable but not writable
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_visibility_scoping() {
    let ctx = TestContext::new().await.unwrap();
    let private = create_test_board(&ctx, "Private", false).await.unwrap();
    let public = create_test_board(&ctx, "Public", true).await.unwrap();

    let (_, stranger_token) = create_test_user(&ctx.db).await.unwrap();

    // A private board without a grant is a 404, not a 403.
    let (status, _) = send(
        &ctx.app,
        authed_json(
            "GET",
            &format!("/boards/{}", private.id),
            &stranger_token,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The listing only shows the public board.
    let (status, body) = send(
        &ctx.app,
        authed_json("GET", "/boards", &stranger_token, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert!(listed.contains(&public.id.to_string().as_str()));
    assert!(!listed.contains(&private.id.to_string().as_str()));

    // Public board reads succeed with a null access level...
    let (status, body) = send(
        &ctx.app,
        authed_json(
            "GET",
            &format!("/boards/{}", public.id),
            &stranger_token,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_level"].is_null());

    // ...but writes without a grant are forbidden.
    let (status, _) = send(
        &ctx.app,
        authed_json(
            "PATCH",
            &format!("/boards/{}", public.id),
            &stranger_token,
            Some(json!({ "name": "Hijacked" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

/// A ReadOnly grant can read but not write; granting twice is a
/// validation error
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_readonly_grant_and_duplicate_grant() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Shared", false).await.unwrap();

    let (reader, reader_token) = create_test_user(&ctx.db).await.unwrap();

    let (status, body) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/boards/{}/access", board.id),
            &ctx.token,
            Some(json!({ "user_id": reader.id, "level": 2000 })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED, "grant: {}", body);

    // Reads work now.
    let (status, _) = send(
        &ctx.app,
        authed_json(
            "GET",
            &format!("/boards/{}", board.id),
            &reader_token,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Writes don't: stage creation needs ReadWrite.
    let (status, _) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/boards/{}/stages", board.id),
            &reader_token,
            Some(json!({ "name": "Blocked" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A second grant for the same (board, user) pair is rejected.
    let (status, _) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/boards/{}/access", board.id),
            &ctx.token,
            Some(json!({ "user_id": reader.id, "level": 1000 })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await.unwrap();
}

/// Tag names are unique per board among live tags, and deleting frees
/// the name for reuse
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_tag_name_uniqueness_and_reuse() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Tagged", false).await.unwrap();
    let tags_uri = format!("/boards/{}/tags", board.id);

    let (status, body) = send(
        &ctx.app,
        authed_json(
            "POST",
            &tags_uri,
            &ctx.token,
            Some(json!({ "name": "bug", "color": "#ff0000" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED, "create tag: {}", body);
    let tag_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &ctx.app,
        authed_json("POST", &tags_uri, &ctx.token, Some(json!({ "name": "bug" }))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &ctx.app,
        authed_json(
            "DELETE",
            &format!("{}/{}", tags_uri, tag_id),
            &ctx.token,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Soft delete: the name is free again.
    let (status, _) = send(
        &ctx.app,
        authed_json("POST", &tags_uri, &ctx.token, Some(json!({ "name": "bug" }))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    ctx.cleanup().await.unwrap();
}

/// A task's stage must belong to the task's board
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_cross_board_stage_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let board_a = create_test_board(&ctx, "A", false).await.unwrap();
    let board_b = create_test_board(&ctx, "B", false).await.unwrap();

    let foreign_stage = &Stage::list_by_board(&ctx.db, board_b.id).await.unwrap()[0];

    let (status, _) = send(
        &ctx.app,
        authed_json(
            "POST",
            "/tasks",
            &ctx.token,
            Some(json!({
                "board_id": board_a.id,
                "stage_id": foreign_stage.id,
                "name": "Misfiled"
            })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await.unwrap();
}

/// Moving a stage renumbers priorities densely and preserves the
/// relative order of untouched siblings
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_stage_reorder() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Ordered", false).await.unwrap();

    let stages = Stage::list_by_board(&ctx.db, board.id).await.unwrap();
    let done = stages.last().unwrap();

    // Move "Done" to the front.
    let (status, body) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/boards/{}/stages/{}/move", board.id, done.id),
            &ctx.token,
            Some(json!({ "index": 0 })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK, "move: {}", body);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Done", "To Do", "In Progress"]);

    let priorities: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["priority"].as_i64().unwrap())
        .collect();
    assert_eq!(priorities, [0, 1, 2]);

    ctx.cleanup().await.unwrap();
}

/// Moving a task within its stage renumbers priorities densely and
/// preserves the relative order of untouched siblings
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_task_reorder() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Queue", false).await.unwrap();
    let stage = &Stage::list_by_board(&ctx.db, board.id).await.unwrap()[0];

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let (status, body) = send(
            &ctx.app,
            authed_json(
                "POST",
                "/tasks",
                &ctx.token,
                Some(json!({ "board_id": board.id, "stage_id": stage.id, "name": name })),
            ),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED, "create {}: {}", name, body);
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    // Move "third" to the front of its stage.
    let (status, body) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/tasks/{}/move", ids[2]),
            &ctx.token,
            Some(json!({ "index": 0 })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK, "move: {}", body);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["third", "first", "second"]);

    let priorities: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["priority"].as_i64().unwrap())
        .collect();
    assert_eq!(priorities, [0, 1, 2]);

    ctx.cleanup().await.unwrap();
}

/// Task listings filter by stage-name substring, and the summary counts
/// each matching task once
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_task_filters_and_summary() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Busy", false).await.unwrap();

    let stages = Stage::list_by_board(&ctx.db, board.id).await.unwrap();
    let (todo, done) = (&stages[0], &stages[2]);

    for (name, stage_id) in [("one", todo.id), ("two", todo.id), ("three", done.id)] {
        let (status, body) = send(
            &ctx.app,
            authed_json(
                "POST",
                "/tasks",
                &ctx.token,
                Some(json!({ "board_id": board.id, "stage_id": stage_id, "name": name })),
            ),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED, "create {}: {}", name, body);
    }

    // `status` matches the stage name case-insensitively by substring.
    let (status, body) = send(
        &ctx.app,
        authed_json("GET", "/tasks?status=to%20do", &ctx.token, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&ctx.app, authed_json("GET", "/summary", &ctx.token, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["to_do"], 2);
    assert_eq!(body["in_progress"], 0);
    assert_eq!(body["done"], 1);

    ctx.cleanup().await.unwrap();
}

/// Task detail includes its live tags; updates can replace the tag set
#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_task_tags_round_trip() {
    let ctx = TestContext::new().await.unwrap();
    let board = create_test_board(&ctx, "Labelled", false).await.unwrap();
    let stage = &Stage::list_by_board(&ctx.db, board.id).await.unwrap()[0];

    let (status, tag) = send(
        &ctx.app,
        authed_json(
            "POST",
            &format!("/boards/{}/tags", board.id),
            &ctx.token,
            Some(json!({ "name": "urgent", "color": "#cc0000" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let (status, task) = send(
        &ctx.app,
        authed_json(
            "POST",
            "/tasks",
            &ctx.token,
            Some(json!({
                "board_id": board.id,
                "stage_id": stage.id,
                "name": "Fix it",
                "tags": [tag["id"]]
            })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED, "create task: {}", task);
    assert_eq!(task["tags"][0]["name"], "urgent");

    // Replace the tag set with nothing.
    let task_id = task["id"].as_str().unwrap();
    let (status, task) = send(
        &ctx.app,
        authed_json(
            "PATCH",
            &format!("/tasks/{}", task_id),
            &ctx.token,
            Some(json!({ "tags": [] })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["tags"].as_array().unwrap().len(), 0);

    ctx.cleanup().await.unwrap();
}
