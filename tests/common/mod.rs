#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use postline::api::{self, AppState};
use postline::config::{Config, SecurityConfig};
use postline::db::Store;
use postline::services::{MailError, Mailer};
use serde_json::Value;
use tower::ServiceExt;

/// Mailer double that fails a scripted number of times before succeeding.
#[derive(Default)]
pub struct ScriptedMailer {
    failures_remaining: AtomicUsize,
    pub attempts: AtomicUsize,
    pub delivered: Mutex<Vec<(String, HashMap<String, String>)>>,
}

impl ScriptedMailer {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Mailer for ScriptedMailer {
    async fn send(
        &self,
        _template: &str,
        _recipient_name: &str,
        recipient_email: &str,
        vars: &HashMap<String, String>,
        _sandbox: bool,
    ) -> Result<u16, MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(MailError::Rejected(503));
        }

        self.delivered
            .lock()
            .unwrap()
            .push((recipient_email.to_string(), vars.clone()));
        Ok(200)
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub mailer: Arc<ScriptedMailer>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = format!(
        "sqlite:{}",
        std::env::temp_dir()
            .join(format!("postline-test-{}.db", uuid::Uuid::new_v4()))
            .display()
    );
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };
    config.auth.token.secret = "test-secret".to_string();
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), ScriptedMailer::default()).await
}

pub async fn spawn_app_with(config: Config, mailer: ScriptedMailer) -> TestApp {
    let store = Store::with_pool_options(&config.general.database_path, 5, 1)
        .await
        .expect("Failed to open test database");
    let mailer = Arc::new(mailer);

    let state = api::create_app_state(config, store, mailer.clone(), None);
    TestApp { state, mailer }
}

impl TestApp {
    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Registers a user and returns `(user_id, activation_token)`.
    pub async fn register(&self, username: &str) -> (i32, String) {
        let (status, body) = self
            .request(
                "POST",
                "/v1/authentication/user",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        let id = body["data"]["user"]["id"].as_i64().unwrap() as i32;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (id, token)
    }

    /// Registers, activates and logs in; returns `(user_id, bearer_token)`.
    pub async fn signup(&self, username: &str) -> (i32, String) {
        let (id, token) = self.register(username).await;

        let (status, _) = self
            .request("PUT", &format!("/v1/users/activate/{token}"), None, None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = self
            .request(
                "POST",
                "/v1/authentication/token",
                None,
                Some(serde_json::json!({
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "login failed: {body}");

        (id, body["data"].as_str().unwrap().to_string())
    }

    pub async fn create_post(&self, bearer: &str, title: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/v1/posts/create",
                Some(bearer),
                Some(serde_json::json!({
                    "title": title,
                    "content": format!("content of {title}"),
                    "tags": ["rust"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
        body["data"].clone()
    }
}
