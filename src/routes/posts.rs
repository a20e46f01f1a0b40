/**
 * Post Routes
 * Feed, post detail and post lifecycle endpoints
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    auth::{can_modify, is_owner, AuthUser},
    db::models::{Comment, MediaKind, NewPost, Post, PostLike, StoredMedia},
    error::{ApiError, ApiResult},
    feed::{compose_feed, FeedRequest},
    state::AppState,
    upload::Payload,
    validation::{pagination, path_id, sanitize_content, Location, Validator},
};

const INVALID_POST_ID: &str = "Post ID must be a valid id.";
const POST_NOT_FOUND: &str = "Post not found!";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub posts: Vec<Post>,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
    pub comments_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikesResponse {
    pub likes: Vec<PostLike>,
    pub likes_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostResponse {
    pub message: &'static str,
    pub deleted_post: Post,
    pub deleted_comments: u64,
    pub deleted_likes: u64,
    pub deleted_media: usize,
}

fn post_id(raw: &str) -> ApiResult<uuid::Uuid> {
    path_id("postId", raw, INVALID_POST_ID)
}

/// Sanitized content; a non-string value is recorded as a field error.
fn content_field(v: &mut Validator, payload: &Payload) -> Option<String> {
    let value = payload.get("content")?;
    match value.as_str() {
        Some(s) => Some(sanitize_content(s)),
        None => {
            v.push(
                Location::Body,
                "content",
                Some(value.clone()),
                "Content must be a string.",
            );
            None
        }
    }
}

fn require_content(v: &mut Validator, content: &str) {
    v.push(
        Location::Body,
        "content",
        Some(Value::from(content)),
        "Content is required.",
    );
}

/// GET /posts - The caller's feed
pub async fn feed(
    State(state): State<AppState>,
    viewer: AuthUser,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<FeedResponse>> {
    let mut v = Validator::new();
    let (page, limit) = pagination(&mut v, &query);
    v.finish()?;

    let page = compose_feed(
        state.store.as_ref(),
        FeedRequest {
            viewer: viewer.id,
            page,
            limit,
        },
    )
    .await?;

    Ok(Json(FeedResponse {
        posts: page.posts,
        current_page: page.current_page,
        total_pages: page.total_pages,
        has_next_page: page.has_next_page,
    }))
}

/// GET /posts/{postId} - A post with its comments
pub async fn get_post(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<PostDetailResponse>> {
    let id = post_id(&raw_id)?;
    let post = state
        .store
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;
    let comments = state.store.comments_for_post(id).await?;

    Ok(Json(PostDetailResponse { post, comments }))
}

/// GET /posts/{postId}/comments
pub async fn get_post_comments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<CommentsResponse>> {
    let id = post_id(&raw_id)?;
    let comments = state.store.comments_for_post(id).await?;

    Ok(Json(CommentsResponse {
        comments_count: comments.len(),
        comments,
    }))
}

/// GET /posts/{postId}/likes
pub async fn get_post_likes(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<LikesResponse>> {
    let id = post_id(&raw_id)?;
    let likes = state
        .store
        .likes_for_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("No likes found for this post!"))?;

    Ok(Json(LikesResponse {
        likes_count: likes.len(),
        likes,
    }))
}

/// POST /posts - Create a post, optionally with one image
pub async fn create_post(
    State(state): State<AppState>,
    author: AuthUser,
    mut payload: Payload,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let mut v = Validator::new();
    let content = content_field(&mut v, &payload).unwrap_or_default();
    if v.is_empty() && content.is_empty() {
        require_content(&mut v, &content);
    }
    v.finish()?;

    payload.ensure_files(&["postImage"], 1)?;
    let media = match payload.take_file("postImage") {
        Some(file) => {
            let stored = state.media.upload(&file).await?;
            Some(StoredMedia {
                url: stored.url,
                public_id: stored.public_id,
                kind: MediaKind::Image,
            })
        }
        None => None,
    };

    let post = state
        .store
        .create_post(NewPost {
            author: author.id,
            content,
            media,
        })
        .await?;

    tracing::info!(post_id = %post.id, author = %author.id, "Post created");
    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

/// PUT /posts/{postId} - Edit content; author only
pub async fn update_post(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(raw_id): Path<String>,
    payload: Payload,
) -> ApiResult<Json<PostResponse>> {
    let mut v = Validator::new();
    let id = v.param_id("postId", &raw_id, INVALID_POST_ID);
    let content = content_field(&mut v, &payload);
    if let Some(content) = content.as_deref().filter(|c| c.is_empty()) {
        require_content(&mut v, content);
    }
    v.finish()?;

    let post = state
        .store
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;
    if !is_owner(&actor, post.author.id) {
        return Err(ApiError::forbidden("User not authorized to update this post!"));
    }

    let Some(content) = content else {
        return Ok(Json(PostResponse { post }));
    };
    let post = state
        .store
        .update_post_content(id, content)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;

    tracing::info!(post_id = %post.id, "Post updated");
    Ok(Json(PostResponse { post }))
}

/// DELETE /posts/{postId} - Remove a post and everything hanging off it
pub async fn delete_post(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<DeletePostResponse>> {
    let id = post_id(&raw_id)?;
    let post = state
        .store
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;
    if !can_modify(&actor, post.author.id) {
        return Err(ApiError::forbidden("User not authorized to delete this post!"));
    }

    let deletion = state
        .store
        .delete_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;

    for media in &deletion.deleted_media {
        let Some(public_id) = media.public_id.as_deref() else {
            continue;
        };
        if let Err(e) = state.media.destroy(public_id).await {
            tracing::warn!(public_id = %public_id, "Failed to delete remote media: {}", e);
        }
    }

    tracing::info!(
        post_id = %id,
        comments = deletion.deleted_comments,
        likes = deletion.deleted_likes,
        media = deletion.deleted_media.len(),
        "Post deleted"
    );

    Ok(Json(DeletePostResponse {
        message: "Post deleted",
        deleted_post: deletion.post,
        deleted_comments: deletion.deleted_comments,
        deleted_likes: deletion.deleted_likes,
        deleted_media: deletion.deleted_media.len(),
    }))
}
