mod common;

use axum::http::StatusCode;
use common::spawn_app;
use postline::services::PostError;
use serde_json::json;

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = spawn_app().await;

    for (method, uri) in [
        ("GET", "/v1/users/feed"),
        ("GET", "/v1/users/1"),
        ("PUT", "/v1/users/1/follow"),
        ("POST", "/v1/posts/create"),
        ("GET", "/v1/posts/1"),
        ("GET", "/v1/comments/1"),
    ] {
        let (status, _) = app.request(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let (status, _) = app
        .request("GET", "/v1/users/feed", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = spawn_app().await;
    let (user_id, bearer) = app.signup("olivia").await;

    let post = app.create_post(&bearer, "first").await;
    assert_eq!(post["version"], json!(0));
    assert_eq!(post["user_id"], json!(user_id));
    assert_eq!(post["tags"], json!(["rust"]));
    let id = post["id"].as_i64().unwrap();

    let (status, body) = app
        .request("GET", &format!("/v1/posts/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], json!("first"));
    assert_eq!(body["data"]["comments"], json!([]));

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/v1/posts/{id}"),
            Some(&bearer),
            Some(json!({ "title": "edited", "version": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], json!(1));
    assert_eq!(body["data"]["title"], json!("edited"));
    assert_eq!(body["data"]["content"], json!("content of first"));

    let (status, _) = app
        .request("DELETE", &format!("/v1/posts/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request("GET", &format!("/v1/posts/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("DELETE", &format!("/v1/posts/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let app = spawn_app().await;
    let (_, bearer) = app.signup("peggy").await;
    let id = app.create_post(&bearer, "draft").await["id"].as_i64().unwrap();

    let (status, _) = app
        .request(
            "PATCH",
            &format!("/v1/posts/{id}"),
            Some(&bearer),
            Some(json!({ "content": "second revision", "version": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "PATCH",
            &format!("/v1/posts/{id}"),
            Some(&bearer),
            Some(json!({ "content": "lost update", "version": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .request("GET", &format!("/v1/posts/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(body["data"]["content"], json!("second revision"));
    assert_eq!(body["data"]["version"], json!(1));
}

#[tokio::test]
async fn test_concurrent_updates_from_same_version() {
    let app = spawn_app().await;
    let (_, bearer) = app.signup("rupert").await;
    let id = app.create_post(&bearer, "race").await["id"].as_i64().unwrap() as i32;

    let posts = app.state.posts.clone();
    let mut first = posts.get(id).await.unwrap();
    let mut second = first.clone();
    first.title = "from first".to_string();
    second.title = "from second".to_string();

    let (a, b) = tokio::join!(posts.update(first), posts.update(second));

    let succeeded = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    assert!(
        matches!(a, Err(PostError::Conflict)) || matches!(b, Err(PostError::Conflict))
    );

    let stored = posts.get(id).await.unwrap();
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_update_missing_post() {
    let app = spawn_app().await;
    let (_, bearer) = app.signup("sybil").await;

    let (status, _) = app
        .request(
            "PATCH",
            "/v1/posts/424242",
            Some(&bearer),
            Some(json!({ "title": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_payload_validation() {
    let app = spawn_app().await;
    let (_, bearer) = app.signup("trent").await;

    let (status, _) = app
        .request(
            "POST",
            "/v1/posts/create",
            Some(&bearer),
            Some(json!({ "title": "", "content": "body" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/v1/posts/create",
            Some(&bearer),
            Some(json!({ "title": "x".repeat(101), "content": "body" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/v1/posts/create",
            Some(&bearer),
            Some(json!({ "title": "t", "content": "body", "version": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
