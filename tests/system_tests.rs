mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use common::spawn_app;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, body) = app.request("GET", "/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));
    assert_eq!(body["data"]["env"], json!("development"));
    assert_eq!(body["data"]["version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_metrics_require_basic_auth() {
    let app = spawn_app().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/v1/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let wrong = STANDARD.encode("admin:nope");
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/v1/metrics")
                .header(header::AUTHORIZATION, format!("Basic {wrong}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let basic = &app.state.config.auth.basic;
    let right = STANDARD.encode(format!("{}:{}", basic.username, basic.password));
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/v1/metrics")
                .header(header::AUTHORIZATION, format!("Basic {right}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/authentication/user")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"username\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = spawn_app().await;

    let (status, _) = app.request("GET", "/v1/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
