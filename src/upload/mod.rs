/*!
 * Uploads
 * Request body parsing (JSON or multipart), image checks and the media storage seam
 */
pub mod cloudinary;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ApiError;

/// Per-file cap for uploaded images.
pub const MAX_IMAGE_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    /// A file broke the upload limits (count, field name, size).
    #[error("{0}")]
    Rejected(String),

    /// Same as `Rejected`, reported by the profile photo endpoint.
    #[error("{0}")]
    PhotoRejected(String),

    /// A file whose type is not an image.
    #[error("Not an image! Please upload only images.")]
    NotAnImage,

    /// Storage provider failed or is unavailable.
    #[error("{0}")]
    Provider(String),
}

impl UploadError {
    /// Report limit failures under the profile photo prefix.
    pub fn photo(self) -> Self {
        match self {
            UploadError::Rejected(reason) => UploadError::PhotoRejected(reason),
            other => other,
        }
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, UploadError>;
    async fn destroy(&self, public_id: &str) -> Result<(), UploadError>;
}

/// Used when no storage credentials are configured.
#[derive(Debug, Default)]
pub struct DisabledStorage;

#[async_trait]
impl MediaStorage for DisabledStorage {
    async fn upload(&self, _file: &UploadedFile) -> Result<StoredObject, UploadError> {
        Err(UploadError::Provider(
            "media storage is not configured".to_string(),
        ))
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), UploadError> {
        Err(UploadError::Provider(
            "media storage is not configured".to_string(),
        ))
    }
}

/// Sniff the leading bytes of a file for a supported image format.
pub fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Accept only image files within the size cap.
pub fn check_image(content_type: &str, bytes: &[u8]) -> Result<(), UploadError> {
    if !content_type.starts_with("image/") {
        return Err(UploadError::NotAnImage);
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(UploadError::Rejected("File too large".to_string()));
    }
    if validate_image_magic_bytes(bytes).is_none() {
        return Err(UploadError::NotAnImage);
    }
    Ok(())
}

/// A request body that may arrive as JSON, as `multipart/form-data`, or empty.
///
/// Multipart text fields land in `body` as strings so validators read both
/// encodings the same way.
#[derive(Debug, Default)]
pub struct Payload {
    pub body: Value,
    pub files: Vec<UploadedFile>,
}

impl Payload {
    pub fn from_json(body: Value) -> Self {
        Self {
            body,
            files: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key).filter(|v| !v.is_null())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let pos = self.files.iter().position(|f| f.field == field)?;
        Some(self.files.remove(pos))
    }

    /// Check the attached files against the endpoint's limits: count,
    /// field names (each at most once), then image type and size.
    pub fn ensure_files(&self, allowed: &[&str], max_files: usize) -> Result<(), UploadError> {
        if self.files.len() > max_files {
            return Err(UploadError::Rejected("Too many files".to_string()));
        }
        for (i, file) in self.files.iter().enumerate() {
            let repeated = self.files[..i].iter().any(|f| f.field == file.field);
            if repeated || !allowed.contains(&file.field.as_str()) {
                return Err(UploadError::Rejected("Unexpected field".to_string()));
            }
            check_image(&file.content_type, &file.bytes)?;
        }
        Ok(())
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut body = Map::new();
        let mut files = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::message(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::message(e.status(), e.body_text()))?;

                files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::message(e.status(), e.body_text()))?;
                body.insert(name, Value::String(text));
            }
        }

        Ok(Self {
            body: Value::Object(body),
            files,
        })
    }
}

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::message(e.status(), e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::message(e.status(), e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::from_json(Value::Object(Map::new())));
        }

        let body = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!("Malformed JSON body: {}", e);
            ApiError::bad_request("Malformed JSON body")
        })?;
        Ok(Self::from_json(body))
    }
}
