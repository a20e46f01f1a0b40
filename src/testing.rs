//! Test harness: the real router over an in-memory store and fake providers.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use crate::{
    auth::{
        github::{IdentityProvider, ProviderError, ProviderProfile},
        issue_token,
    },
    config::{AppConfig, GithubConfig},
    db::models::{NewUser, User, ROLE_ADMIN, ROLE_USER},
    state::AppState,
    store::{MemoryStore, Store},
    upload::{MediaStorage, StoredObject, UploadError, UploadedFile},
};

pub const TEST_SECRET: &str = "test-secret";
pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
const BOUNDARY: &str = "XTESTBOUNDARYX";

/// Records uploads and deletions instead of talking to a provider.
#[derive(Debug, Default)]
pub struct FakeStorage {
    pub uploaded: Mutex<Vec<String>>,
    pub destroyed: Mutex<Vec<String>>,
    pub fail_uploads: bool,
}

#[async_trait]
impl MediaStorage for FakeStorage {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, UploadError> {
        if self.fail_uploads {
            return Err(UploadError::Provider("provider down".to_string()));
        }
        let mut uploaded = self.uploaded.lock().unwrap();
        let public_id = format!("test/{}-{}", file.field, uploaded.len());
        uploaded.push(public_id.clone());
        Ok(StoredObject {
            url: format!("https://cdn.test/{public_id}.png"),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Accepts the code "good-code" and rejects everything else.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorize_url(&self) -> Result<String, ProviderError> {
        Ok("https://github.test/login/oauth/authorize?client_id=test&scope=user%3Aemail".to_string())
    }

    async fn exchange(&self, code: &str) -> Result<ProviderProfile, ProviderError> {
        if code != "good-code" {
            return Err(ProviderError::Rejected("bad_verification_code".to_string()));
        }
        Ok(ProviderProfile {
            id: "583231".to_string(),
            username: Some("octocat".to_string()),
            email: Some("octocat@github.test".to_string()),
            avatar: Some("https://avatars.test/octocat.png".to_string()),
            bio: None,
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        github: GithubConfig {
            client_id: "test".to_string(),
            client_secret: "test".to_string(),
            callback_url: "http://localhost:3000/auth/github/callback".to_string(),
        },
        cloudinary: None,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<FakeStorage>,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(FakeStorage::default())
    }

    pub fn with_storage(storage: FakeStorage) -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(storage);
        let state = AppState::new(
            store.clone(),
            storage.clone(),
            Arc::new(FakeIdentity),
            test_config(),
        );
        Self {
            store,
            storage,
            state,
        }
    }

    pub fn router(&self) -> Router {
        crate::create_app(self.state.clone())
    }

    async fn create_user(&self, name: &str, role: &str) -> (User, String) {
        let user = self
            .store
            .create_user(NewUser {
                github_id: format!("gh-{name}"),
                first_name: name.to_string(),
                last_name: "Tester".to_string(),
                email: Some(format!("{name}@mail.test")),
                profile_picture: None,
                bio: None,
                role: role.to_string(),
                is_guest: false,
            })
            .await
            .unwrap();
        let token = issue_token(&user, TEST_SECRET).unwrap();
        (user, token)
    }

    pub async fn user(&self, name: &str) -> (User, String) {
        self.create_user(name, ROLE_USER).await
    }

    pub async fn admin(&self, name: &str) -> (User, String) {
        self.create_user(name, ROLE_ADMIN).await
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.router().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// JSON request; `token` goes in the bearer header.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.send(req).await;
        (res.status, res.body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, body).await
    }

    /// `multipart/form-data` request with text fields and
    /// `(field, file name, content type, bytes)` files.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &str, &[u8])],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, content_type, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let res = self.send(builder.body(Body::from(body)).unwrap()).await;
        (res.status, res.body)
    }
}
