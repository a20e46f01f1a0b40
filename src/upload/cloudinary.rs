//! Cloudinary signed uploads over its REST API.
//!
//! Requests are signed with SHA-256. Cloudinary checks signatures with
//! SHA-1 unless the account's signature algorithm is set to SHA-256, so the
//! account must be configured that way for uploads and deletes to succeed.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{MediaStorage, StoredObject, UploadError, UploadedFile};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: Option<String>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.config.cloud_name)
    }

    /// Sign `params` as Cloudinary expects: sorted `key=value` pairs joined
    /// with `&`, followed by the API secret, digested with SHA-256.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Form {
        let signature = self.sign(&params);
        params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }
}

fn provider_error(e: reqwest::Error) -> UploadError {
    UploadError::Provider(e.to_string())
}

#[async_trait]
impl MediaStorage for CloudinaryStorage {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let form = self.signed_form(vec![
            ("allowed_formats", "jpg,png,gif,webp".to_string()),
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp),
        ]);

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone().unwrap_or_else(|| "upload".to_string()))
            .mime_str(&file.content_type)
            .map_err(provider_error)?;

        let response: UploadResponse = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form.part("file", part))
            .send()
            .await
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        if let Some(err) = response.error {
            return Err(UploadError::Provider(err.message));
        }
        match (response.secure_url, response.public_id) {
            (Some(url), Some(public_id)) => {
                tracing::debug!(public_id = %public_id, "Uploaded media to Cloudinary");
                Ok(StoredObject { url, public_id })
            }
            _ => Err(UploadError::Provider(
                "incomplete upload response".to_string(),
            )),
        }
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
        ]);

        let response: DestroyResponse = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        if let Some(err) = response.error {
            return Err(UploadError::Provider(err.message));
        }
        match response.result.as_deref() {
            Some("ok") => Ok(()),
            other => Err(UploadError::Provider(format!(
                "destroy returned {}",
                other.unwrap_or("nothing")
            ))),
        }
    }
}
