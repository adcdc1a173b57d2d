use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CreateTokenRequest};

/// The caller behind a valid bearer token. Inserted into request extensions by
/// [`auth_middleware`]; handlers take it as `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Bearer-token authentication for the user-facing API.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(ApiError::unauthorized)?;

    let claims = state.tokens.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::unauthorized()
    })?;

    let user_id = claims.user_id().ok_or_else(ApiError::unauthorized)?;

    let user = match state.users.get_user(user_id).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(crate::services::UserError::NotFound) => {
            return Err(ApiError::unauthorized());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// HTTP basic authentication for operator endpoints.
pub async fn basic_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let basic = &state.config.auth.basic;

    let authorized = basic_credentials(request.headers())
        .is_some_and(|(user, pass)| user == basic.username && pass == basic.password);

    if authorized {
        return next.run(request).await;
    }

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error("unauthorized")),
    )
        .into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="restricted", charset="UTF-8""#),
    );
    response
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;

    Some((user.to_string(), pass.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/authentication/token
/// Exchanges email + password of an active user for a bearer token.
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    let Json(payload) = payload?;

    if payload.email.is_empty() {
        return Err(ApiError::validation("email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))?;

    tracing::info!(user_id = user.id, "Issued bearer token");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(token))))
}
