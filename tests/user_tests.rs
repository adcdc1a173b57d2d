mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{ScriptedMailer, spawn_app, spawn_app_with, test_config};
use postline::entities::{user_invitations, users};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use serde_json::json;
use tower::ServiceExt;

fn registration(username: &str, email: &str) -> serde_json::Value {
    json!({ "username": username, "email": email, "password": "hunter22" })
}

#[tokio::test]
async fn test_register_creates_inactive_user_and_mails_link() {
    let app = spawn_app().await;

    let (status, body) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("alice", "alice@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["user"]["is_active"], json!(false));
    assert!(body["data"]["user"].get("password_hash").is_none());

    let delivered = app.mailer.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "alice@example.com");
    assert!(delivered[0].1["activation_url"].ends_with(&format!("/confirm/{token}")));
}

#[tokio::test]
async fn test_activation_is_single_use() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("bob").await;

    let (status, _) = app
        .request("PUT", &format!("/v1/users/activate/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let user = app.state.store.get_user(user_id).await.unwrap().unwrap();
    assert!(user.is_active);
    assert!(
        app.state
            .store
            .get_user_invitation(user_id)
            .await
            .unwrap()
            .is_none()
    );

    let (status, body) = app
        .request("PUT", &format!("/v1/users/activate/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_activations_redeem_token_once() {
    let app = spawn_app().await;

    for round in 0..5 {
        let (user_id, token) = app.register(&format!("racer{round}")).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let router = app.router();
                let uri = format!("/v1/users/activate/{token}");
                tokio::spawn(async move {
                    router
                        .oneshot(
                            Request::builder()
                                .method("PUT")
                                .uri(uri)
                                .body(Body::empty())
                                .unwrap(),
                        )
                        .await
                        .unwrap()
                        .status()
                })
            })
            .collect();

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap());
        }

        let activated = statuses
            .iter()
            .filter(|s| **s == StatusCode::NO_CONTENT)
            .count();
        let rejected = statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count();
        assert_eq!((activated, rejected), (1, 3), "round {round}: {statuses:?}");

        let user = app.state.store.get_user(user_id).await.unwrap().unwrap();
        assert!(user.is_active);
    }
}

#[tokio::test]
async fn test_expired_invitation_is_rejected() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("carol").await;

    user_invitations::Entity::update_many()
        .col_expr(
            user_invitations::Column::Expiry,
            Expr::value("2000-01-01T00:00:00.000000Z"),
        )
        .filter(user_invitations::Column::UserId.eq(user_id))
        .exec(&app.state.store.conn)
        .await
        .unwrap();

    let (status, _) = app
        .request("PUT", &format!("/v1/users/activate/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = app.state.store.get_user(user_id).await.unwrap().unwrap();
    assert!(!user.is_active);
}

#[tokio::test]
async fn test_unknown_activation_token() {
    let app = spawn_app().await;

    let (status, _) = app
        .request("PUT", "/v1/users/activate/not-a-real-token", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undeliverable_invitation_rolls_back_registration() {
    let config = test_config();
    let max_retries = config.mail.max_retries as usize;
    let app = spawn_app_with(config, ScriptedMailer::failing(usize::MAX)).await;

    let (status, body) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("dave", "dave@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("the server encountered a problem"));
    assert_eq!(app.mailer.attempts(), max_retries);

    let remaining = users::Entity::find()
        .filter(users::Column::Email.eq("dave@example.com"))
        .one(&app.state.store.conn)
        .await
        .unwrap();
    assert!(remaining.is_none());
    assert!(
        user_invitations::Entity::find()
            .all(&app.state.store.conn)
            .await
            .unwrap()
            .is_empty()
    );

    // The address is free again.
    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("dave", "dave@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_failed_cleanup_leaves_pending_user_and_reports_internal_error() {
    let app = spawn_app_with(test_config(), ScriptedMailer::failing(usize::MAX)).await;

    app.state
        .store
        .conn
        .execute_unprepared(
            "CREATE TRIGGER block_user_delete BEFORE DELETE ON users \
             BEGIN SELECT RAISE(ABORT, 'user rows are locked'); END",
        )
        .await
        .unwrap();

    let (status, body) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("orphan", "orphan@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("the server encountered a problem"));

    let user = users::Entity::find()
        .filter(users::Column::Email.eq("orphan@example.com"))
        .one(&app.state.store.conn)
        .await
        .unwrap()
        .expect("pending user should remain");
    assert!(!user.is_active);

    let invitation = app.state.store.get_user_invitation(user.id).await.unwrap();
    assert!(invitation.is_some());
}

#[tokio::test]
async fn test_transient_mail_failures_are_retried() {
    let config = test_config();
    let failures = config.mail.max_retries as usize - 1;
    let app = spawn_app_with(config, ScriptedMailer::failing(failures)).await;

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("erin", "erin@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.mailer.attempts(), failures + 1);
}

#[tokio::test]
async fn test_duplicate_email_and_username() {
    let app = spawn_app().await;
    app.register("frank").await;

    let (status, body) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("frank2", "frank@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, body) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("frank", "other@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("username"));
}

#[tokio::test]
async fn test_concurrent_registrations_with_same_email() {
    let app = spawn_app().await;

    let (a, b) = tokio::join!(
        app.request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("grace", "grace@example.com")),
        ),
        app.request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("heidi", "grace@example.com")),
        ),
    );

    let created = [a.0, b.0]
        .iter()
        .filter(|s| **s == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);

    let rows = users::Entity::find()
        .filter(users::Column::Email.eq("grace@example.com"))
        .all(&app.state.store.conn)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = spawn_app().await;

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(registration("ivan", "not-an-email")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(json!({ "username": "ivan", "email": "ivan@example.com", "password": "ab" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/user",
            None,
            Some(json!({
                "username": "ivan",
                "email": "ivan@example.com",
                "password": "hunter22",
                "is_active": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.mailer.attempts(), 0);
}

#[tokio::test]
async fn test_token_requires_active_user_and_correct_password() {
    let app = spawn_app().await;
    app.register("judy").await;

    let login = |password: &'static str| {
        json!({ "email": "judy@example.com", "password": password })
    };

    let (status, _) = app
        .request("POST", "/v1/authentication/token", None, Some(login("hunter22")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, bearer) = app.signup("mallory").await;
    assert!(!bearer.is_empty());

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/token",
            None,
            Some(json!({ "email": "mallory@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            "POST",
            "/v1/authentication/token",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_user_profile() {
    let app = spawn_app().await;
    let (id, bearer) = app.signup("niaj").await;

    let (status, body) = app
        .request("GET", &format!("/v1/users/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], json!("niaj"));

    let (status, _) = app
        .request("GET", "/v1/users/99999", Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("GET", "/v1/users/abc", Some(&bearer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
