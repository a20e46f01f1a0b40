/*!
 * API Errors
 * One error type for every handler, rendered into the JSON envelopes clients expect
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{store::StoreError, upload::UploadError, validation::FieldError};

lazy_static::lazy_static! {
    /// Whether 500 responses carry the underlying error text as `stack`.
    static ref EXPOSE_STACK: bool = std::env::var("ENVIRONMENT")
        .map(|env| env == "development")
        .unwrap_or(true);
}

/// Which top-level key carries the human-readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKey {
    Message,
    Error,
}

impl ErrorKey {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKey::Message => "message",
            ErrorKey::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error("{message}")]
    Http {
        status: StatusCode,
        key: ErrorKey,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// `{"message": ...}` with the given status.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            key: ErrorKey::Message,
            message: message.into(),
        }
    }

    /// `{"error": ...}` with the given status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            key: ErrorKey::Error,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::message(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::message(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::message(StatusCode::FORBIDDEN, message)
    }

    pub fn unauthenticated() -> Self {
        Self::message(StatusCode::UNAUTHORIZED, "Access denied. No token provided.")
    }

    pub fn invalid_token() -> Self {
        Self::message(StatusCode::FORBIDDEN, "Invalid token")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Map a store failure to a 500 carrying an endpoint-specific text.
    pub fn store_failure(key: ErrorKey, message: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| {
            tracing::error!("{}: {}", message, err);
            ApiError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                key,
                message: message.to_string(),
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Http { status, .. } => *status,
            ApiError::Upload(UploadError::Rejected(_) | UploadError::PhotoRejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upload(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Body for failures nobody translated into the endpoint's own envelope.
fn server_error_body(detail: &str) -> serde_json::Value {
    if *EXPOSE_STACK {
        json!({
            "success": false,
            "error": { "message": "Server Error", "stack": detail },
        })
    } else {
        json!({
            "success": false,
            "error": { "message": "Server Error" },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            ApiError::Http { key, message, .. } => json!({ (key.as_str()): message }),
            ApiError::Upload(UploadError::Rejected(reason)) => {
                json!({ "error": format!("Image upload error: {reason}") })
            }
            ApiError::Upload(UploadError::PhotoRejected(reason)) => {
                json!({ "error": format!("Photo upload error:  {reason}") })
            }
            ApiError::Upload(UploadError::NotAnImage) => {
                tracing::warn!("Rejected non-image upload");
                json!({ "error": format!("Upload error: {}", UploadError::NotAnImage) })
            }
            ApiError::Upload(err) => {
                tracing::error!("Media upload failed: {}", err);
                json!({ "error": format!("Upload error: {err}") })
            }
            ApiError::Store(err) => {
                tracing::error!("Store error: {}", err);
                server_error_body(&err.to_string())
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                server_error_body(detail)
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": { "message": "Not Found" } })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Location;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_message_envelope() {
        let (status, body) = render(ApiError::not_found("Post not found!")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Post not found!" }));
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) =
            render(ApiError::error(StatusCode::NOT_FOUND, "User not found.")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found.");
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let err = ApiError::Validation(vec![FieldError::new(
            Location::Params,
            "postId",
            Some(json!("nope")),
            "Post ID must be a valid id.",
        )]);
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], "Post ID must be a valid id.");
        assert_eq!(body["errors"][0]["location"], "params");
        assert_eq!(body["errors"][0]["type"], "field");
    }

    #[tokio::test]
    async fn test_upload_errors_split_by_cause() {
        let (status, body) =
            render(UploadError::Rejected("Not an image!".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Image upload error: Not an image!");

        let (status, body) =
            render(UploadError::PhotoRejected("Too many files".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Photo upload error:  Too many files");

        let (status, body) = render(UploadError::NotAnImage.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Upload error: Not an image! Please upload only images.");

        let (status, body) = render(UploadError::Provider("timeout".to_string()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Upload error:"));
    }

    #[tokio::test]
    async fn test_internal_error_uses_generic_body() {
        let (status, body) = render(ApiError::internal("boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["message"], "Server Error");
    }
}
