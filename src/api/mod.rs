use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    CommentService, FollowService, Mailer, PostService, RegistrationSettings,
    SeaOrmCommentService, SeaOrmFollowService, SeaOrmPostService, SeaOrmUserService,
    TokenAuthenticator, UserService, mailer,
};

pub mod auth;
mod comments;
mod error;
mod feed;
mod health;
mod observability;
mod posts;
mod types;
mod users;
pub mod validation;

pub use auth::AuthUser;
pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub users: Arc<dyn UserService>,

    pub posts: Arc<dyn PostService>,

    pub follows: Arc<dyn FollowService>,

    pub comments: Arc<dyn CommentService>,

    pub tokens: TokenAuthenticator,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Wires the services over `store`, delivering invitations through `mailer`.
#[must_use]
pub fn create_app_state(
    config: Config,
    store: Store,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let settings = RegistrationSettings::from_config(&config);

    Arc::new(AppState {
        users: Arc::new(SeaOrmUserService::new(store.clone(), mailer, settings)),
        posts: Arc::new(SeaOrmPostService::new(store.clone())),
        follows: Arc::new(SeaOrmFollowService::new(store.clone())),
        comments: Arc::new(SeaOrmCommentService::new(store.clone())),
        tokens: TokenAuthenticator::new(&config.auth.token),
        config: Arc::new(config),
        store,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = crate::open_store(&config).await?;
    let mailer = mailer::from_config(&config.mail);

    Ok(create_app_state(config, store, mailer, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let max_body_bytes = state.config.server.max_body_bytes;

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .merge(create_operator_router(state.clone()))
        .route("/health", get(health::health))
        .route("/authentication/user", post(users::register_user))
        .route("/authentication/token", post(auth::create_token))
        .route("/users/activate/{token}", put(users::activate_user))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/v1", api_router)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/feed", get(feed::get_feed))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/follow", put(users::follow_user))
        .route("/users/{user_id}/unfollow", put(users::unfollow_user))
        .route("/posts/create", post(posts::create_post))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/comments/create", post(comments::create_comment))
        .route("/comments/{post_id}", get(comments::list_comments))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

fn create_operator_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::basic_auth_middleware,
        ))
}
