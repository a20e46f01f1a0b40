/**
 * Media Routes
 * Images attached to posts after creation
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    auth::{can_modify, AuthUser},
    db::models::{Media, MediaKind, NewMedia, StoredMedia},
    error::{ApiError, ApiResult},
    state::AppState,
    upload::{Payload, UploadError},
    validation::{path_id, Validator},
};

const MEDIA_NOT_FOUND: &str = "Media not found!";
const INVALID_MEDIA_ID: &str = "Invalid media ID format";

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub media: Media,
}

#[derive(Debug, Serialize)]
pub struct DeleteMediaResponse {
    pub message: &'static str,
    pub media: Media,
}

/// Fails unless `actor` may change the post `post_id`.
async fn authorize_for_post(state: &AppState, actor: &AuthUser, post_id: uuid::Uuid) -> ApiResult<()> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found!"))?;
    if !can_modify(actor, post.author.id) {
        return Err(ApiError::forbidden("Not authorized to modify media of this post."));
    }
    Ok(())
}

/// GET /media/{mediaId}
pub async fn get_media(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<MediaResponse>> {
    let id = path_id("mediaId", &media_id, INVALID_MEDIA_ID)?;
    let media = state
        .store
        .find_media(id)
        .await?
        .ok_or_else(|| ApiError::not_found(MEDIA_NOT_FOUND))?;
    Ok(Json(MediaResponse { media }))
}

/// POST /media - Attach an uploaded image to a post
pub async fn create_media(
    State(state): State<AppState>,
    actor: AuthUser,
    mut payload: Payload,
) -> ApiResult<(StatusCode, Json<MediaResponse>)> {
    let mut v = Validator::new();
    let post_id = v.body_id(&payload.body, "postId", "Post ID must be a valid id.");
    v.finish()?;

    payload.ensure_files(&["media"], 1)?;
    let file = payload
        .take_file("media")
        .ok_or_else(|| UploadError::Rejected("No file uploaded.".to_string()))?;

    authorize_for_post(&state, &actor, post_id).await?;

    let stored = state.media.upload(&file).await?;
    let media = state
        .store
        .create_media(NewMedia {
            post: post_id,
            media: StoredMedia {
                url: stored.url,
                public_id: stored.public_id,
                kind: MediaKind::Image,
            },
        })
        .await?;

    tracing::info!(media_id = %media.id, post_id = %post_id, "Media attached");
    Ok((StatusCode::CREATED, Json(MediaResponse { media })))
}

/// DELETE /media/{mediaId}
pub async fn delete_media(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(media_id): Path<String>,
) -> ApiResult<Json<DeleteMediaResponse>> {
    let id = path_id("mediaId", &media_id, INVALID_MEDIA_ID)?;
    let existing = state
        .store
        .find_media(id)
        .await?
        .ok_or_else(|| ApiError::not_found(MEDIA_NOT_FOUND))?;
    authorize_for_post(&state, &actor, existing.post).await?;

    let media = state
        .store
        .delete_media(id)
        .await?
        .ok_or_else(|| ApiError::not_found(MEDIA_NOT_FOUND))?;

    if let Some(public_id) = media.public_id.as_deref() {
        if let Err(e) = state.media.destroy(public_id).await {
            tracing::warn!(public_id = %public_id, "Failed to delete remote media: {}", e);
        }
    }

    Ok(Json(DeleteMediaResponse {
        message: "Media deleted.",
        media,
    }))
}

#[cfg(test)]
mod tests {
    use crate::testing::{TestApp, PNG};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_media_lifecycle() {
        let app = TestApp::new();
        let (_, token) = app.user("ada").await;
        let (_, created) = app.post("/posts", Some(&token), json!({ "content": "gallery" })).await;
        let post_id = created["post"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .multipart(
                Method::POST,
                "/media",
                Some(&token),
                &[("postId", post_id.as_str())],
                &[("media", "pic.png", "image/png", PNG)],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["media"]["type"], "image");
        assert_eq!(body["media"]["post"], post_id.as_str());
        let media_id = body["media"]["id"].as_str().unwrap().to_string();

        let (status, body) = app.get(&format!("/media/{media_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["media"]["id"], media_id.as_str());

        let (_, detail) = app.get(&format!("/posts/{post_id}"), Some(&token)).await;
        assert_eq!(detail["post"]["media"][0]["id"], media_id.as_str());

        let (status, body) = app
            .delete(&format!("/media/{media_id}"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Media deleted.");
        assert_eq!(app.storage.destroyed.lock().unwrap().len(), 1);

        let (status, body) = app.get(&format!("/media/{media_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Media not found!");
    }

    #[tokio::test]
    async fn test_media_id_format() {
        let app = TestApp::new();
        let (status, body) = app.get("/media/12345", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], "Invalid media ID format");
    }

    #[tokio::test]
    async fn test_media_on_foreign_post_is_forbidden() {
        let app = TestApp::new();
        let (_, author) = app.user("author").await;
        let (_, other) = app.user("other").await;
        let (_, created) = app.post("/posts", Some(&author), json!({ "content": "mine" })).await;
        let post_id = created["post"]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .multipart(
                Method::POST,
                "/media",
                Some(&other),
                &[("postId", post_id.as_str())],
                &[("media", "pic.png", "image/png", PNG)],
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(app.storage.uploaded.lock().unwrap().is_empty());
    }
}
