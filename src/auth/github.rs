/**
 * GitHub OAuth
 * Authorization redirect and code exchange against GitHub's OAuth endpoints
 */
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::GithubConfig;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "social-backend";

/// Profile data the provider hands back after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("OAuth provider is not configured")]
    NotConfigured,

    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected the exchange: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start the handshake.
    fn authorize_url(&self) -> Result<String, ProviderError>;

    /// Trade an authorization code for the caller's profile.
    async fn exchange(&self, code: &str) -> Result<ProviderProfile, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

pub struct GithubProvider {
    config: GithubConfig,
    client: reqwest::Client,
}

impl GithubProvider {
    pub fn new(config: GithubConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(ProviderError::NotConfigured);
        }
        Ok(())
    }

    async fn access_token(&self, code: &str) -> Result<String, ProviderError> {
        let response: TokenResponse = self
            .client
            .post(ACCESS_TOKEN_URL)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
                "redirect_uri": self.config.callback_url,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) => Ok(token),
            None => Err(ProviderError::Rejected(
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token returned".to_string()),
            )),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, ProviderError> {
        Ok(self
            .client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Users with a private email only expose it through the emails endpoint.
    async fn primary_email(&self, token: &str) -> Option<String> {
        match self.get::<Vec<GithubEmail>>("/user/emails", token).await {
            Ok(emails) => emails
                .into_iter()
                .find(|e| e.primary && e.verified)
                .map(|e| e.email),
            Err(e) => {
                tracing::debug!("Could not read GitHub emails: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for GithubProvider {
    fn authorize_url(&self) -> Result<String, ProviderError> {
        self.ensure_configured()?;
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("scope", "user:email"),
            ],
        )
        .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn exchange(&self, code: &str) -> Result<ProviderProfile, ProviderError> {
        self.ensure_configured()?;
        let token = self.access_token(code).await?;
        let user: GithubUser = self.get("/user", &token).await?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => Some(email),
            None => self.primary_email(&token).await,
        };

        Ok(ProviderProfile {
            id: user.id.to_string(),
            username: user.login,
            email,
            avatar: user.avatar_url,
            bio: user.bio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(client_id: &str) -> GithubProvider {
        GithubProvider::new(
            GithubConfig {
                client_id: client_id.to_string(),
                client_secret: "secret".to_string(),
                callback_url: "http://localhost:3000/auth/github/callback".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_authorize_url_carries_client_and_scope() {
        let url = provider("abc123").authorize_url().unwrap();
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("scope=user%3Aemail"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
    }

    #[test]
    fn test_unconfigured_provider_refuses() {
        assert!(matches!(
            provider("").authorize_url(),
            Err(ProviderError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_exchange_fails_without_network() {
        let err = provider("").exchange("code").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }
}
