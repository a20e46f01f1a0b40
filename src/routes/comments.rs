/**
 * Comment Routes
 */
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::{can_modify, AuthUser},
    db::models::{Comment, NewComment},
    error::{ApiError, ApiResult, ErrorKey},
    state::AppState,
    upload::Payload,
    validation::{char_len, sanitize_content, Location, Validator},
};

use super::MessageResponse;

#[derive(Debug, Serialize)]
pub struct CreateCommentResponse {
    pub message: &'static str,
    pub comment: Comment,
}

/// POST /comments - Comment on a post
pub async fn create_comment(
    State(state): State<AppState>,
    author: AuthUser,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<CreateCommentResponse>)> {
    let mut v = Validator::new();
    let content = sanitize_content(payload.str("content").unwrap_or_default());
    let value = Value::from(content.as_str());
    if content.is_empty() {
        v.push(Location::Body, "content", Some(value.clone()), "Content field cannot be empty.");
    }
    v.check(
        (1..=500).contains(&char_len(&content)),
        Location::Body,
        "content",
        Some(&value),
        "Comment should be between 1-500 characters long.",
    );
    let post_id =
        v.body_id_non_empty(&payload.body, "postId", "Post cannot be empty.", "Must be valid id.");
    v.finish()?;

    let post = state
        .store
        .find_post(post_id)
        .await
        .map_err(ApiError::store_failure(ErrorKey::Message, "Failed to add comment."))?;
    if post.is_none() {
        return Err(ApiError::not_found("Post not found!"));
    }

    let comment = state
        .store
        .create_comment(NewComment {
            author: author.id,
            post: post_id,
            content,
        })
        .await
        .map_err(ApiError::store_failure(ErrorKey::Message, "Failed to add comment."))?;

    tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment added");
    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse {
            message: "Comment successfully added.",
            comment,
        }),
    ))
}

/// DELETE /comments - Remove a comment; author or admin
pub async fn delete_comment(
    State(state): State<AppState>,
    actor: AuthUser,
    payload: Payload,
) -> ApiResult<Json<MessageResponse>> {
    let mut v = Validator::new();
    let post_id =
        v.body_id_non_empty(&payload.body, "postId", "Post cannot be empty.", "Must be valid id.");
    let comment_id = v.body_id_non_empty(
        &payload.body,
        "commentId",
        "Comment id cannot be empty.",
        "Must be valid id.",
    );
    v.finish()?;

    let comment = state
        .store
        .find_comment(comment_id)
        .await?
        .filter(|c| c.post == post_id)
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;
    if !can_modify(&actor, comment.author.id) {
        return Err(ApiError::forbidden("Not authorized to delete this comment."));
    }

    if !state.store.delete_comment(comment_id).await? {
        return Err(ApiError::not_found("Comment not found."));
    }

    tracing::info!(comment_id = %comment_id, "Comment deleted");
    Ok(Json(MessageResponse::new("Comment deleted successfully.")))
}
