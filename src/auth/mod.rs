/**
 * Authentication
 * JWT issuance and verification, plus the extractors that guard routes
 */
pub mod github;
pub mod provision;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::{User, ROLE_ADMIN},
    error::ApiError,
    state::AppState,
};

/// Token lifetime in hours
const TOKEN_EXPIRY_HOURS: i64 = 24;

/// Cookie that carries the token for browser clients
pub const AUTH_COOKIE: &str = "jwt";

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub id: Uuid,
    pub first_name: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(user: &User, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        id: user.id,
        first_name: user.first_name.clone(),
        role: user.role.clone(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Bearer header first, then the `jwt` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a freshly issued token.
pub fn auth_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_EXPIRY_HOURS * 3600
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// The caller behind a verified token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub first_name: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            first_name: claims.first_name,
            role: claims.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;

        verify_token(&token, &state.config.jwt_secret)
            .map(AuthUser::from)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                ApiError::invalid_token()
            })
    }
}

/// Optional authentication: anonymous when no valid token is presented.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = extract_token(&parts.headers)
            .and_then(|token| verify_token(&token, &state.config.jwt_secret).ok())
            .map(AuthUser::from);
        Ok(MaybeAuthUser(user))
    }
}

/// Owner of the resource or an admin.
pub fn can_modify(actor: &AuthUser, owner: Uuid) -> bool {
    actor.id == owner || actor.is_admin()
}

pub fn is_owner(actor: &AuthUser, owner: Uuid) -> bool {
    actor.id == owner
}
