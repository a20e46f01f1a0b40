/**
 * Authentication Routes
 * GitHub OAuth handshake, guest login and token verification
 */
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    auth::{
        auth_cookie, issue_token,
        provision::{provision_identity, ProviderIdentity},
        AuthUser,
    },
    db::models::User,
    error::{ApiError, ApiResult},
    state::AppState,
};

const AUTH_FAILED: &str = "Authentication failed";

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: &'static str,
    pub user: AuthUser,
}

fn login_failed() -> ApiError {
    ApiError::message(StatusCode::UNAUTHORIZED, AUTH_FAILED)
}

/// Sign a token for `user` and attach it as the `jwt` cookie.
fn token_response(
    state: &AppState,
    status: StatusCode,
    user: User,
    include_user: bool,
) -> ApiResult<Response> {
    let token = issue_token(&user, &state.config.jwt_secret)
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))?;
    let cookie = auth_cookie(&token, state.config.is_production());

    let body = TokenResponse {
        success: true,
        token,
        user: include_user.then_some(user),
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// GET /auth/github - Redirect to the provider's consent screen
pub async fn github_login(State(state): State<AppState>) -> ApiResult<Response> {
    let url = state.identity.authorize_url().map_err(|e| {
        tracing::error!("GitHub login unavailable: {}", e);
        login_failed()
    })?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// GET /auth/github/callback - Exchange the code and log the user in
pub async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let code = query
        .get("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            tracing::debug!("OAuth callback without code: {:?}", query.get("error"));
            login_failed()
        })?;

    let profile = state.identity.exchange(code).await.map_err(|e| {
        tracing::warn!("GitHub code exchange failed: {}", e);
        login_failed()
    })?;

    let user = provision_identity(state.store.as_ref(), ProviderIdentity::from_github(profile))
        .await
        .map_err(|e| {
            tracing::error!("Failed to provision GitHub user: {}", e);
            login_failed()
        })?;

    tracing::info!(user_id = %user.id, "User logged in with GitHub");
    token_response(&state, StatusCode::OK, user, false)
}

/// POST /auth/guest - Log in as a freshly generated guest
pub async fn guest_login(State(state): State<AppState>) -> ApiResult<Response> {
    let user = provision_identity(state.store.as_ref(), ProviderIdentity::guest()).await?;
    tracing::info!(user_id = %user.id, "Guest logged in");
    token_response(&state, StatusCode::CREATED, user, true)
}

/// GET /auth/verify - Echo the identity behind a valid token
pub async fn verify(user: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        message: "Token is valid.",
        user,
    })
}
