/**
 * Like Routes
 * The liking user is always the caller; the post counter moves with each like
 */
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    auth::AuthUser,
    db::models::Like,
    error::{ApiError, ApiResult},
    state::AppState,
    store::StoreError,
    upload::Payload,
    validation::Validator,
};

use super::MessageResponse;

#[derive(Debug, Serialize)]
pub struct CreateLikeResponse {
    pub message: &'static str,
    pub like: Like,
}

fn validate(payload: &Payload) -> ApiResult<uuid::Uuid> {
    let mut v = Validator::new();
    let post_id = v.body_id(&payload.body, "postId", "Invalid Post ID");
    // Accepted from older clients; the caller's id is used regardless.
    v.optional_body_id(&payload.body, "userId", "Invalid User ID");
    v.finish()?;
    Ok(post_id)
}

/// POST /likes
pub async fn create_like(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<CreateLikeResponse>)> {
    let post_id = validate(&payload)?;

    if state.store.find_post(post_id).await?.is_none() {
        return Err(ApiError::not_found("Post not found!"));
    }

    let like = match state.store.create_like(user.id, post_id).await {
        Ok(like) => like,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::bad_request("You have already liked this post."))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, post_id = %post_id, "Post liked");
    Ok((
        StatusCode::CREATED,
        Json(CreateLikeResponse {
            message: "Like created successfully.",
            like,
        }),
    ))
}

/// DELETE /likes
pub async fn delete_like(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> ApiResult<Json<MessageResponse>> {
    let post_id = validate(&payload)?;

    if !state.store.delete_like(user.id, post_id).await? {
        return Err(ApiError::not_found("Like not found."));
    }

    tracing::info!(user_id = %user.id, post_id = %post_id, "Post unliked");
    Ok(Json(MessageResponse::new("Like deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use crate::{store::Store, testing::TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    async fn post(app: &TestApp, token: &str) -> uuid::Uuid {
        let (_, body) = app.post("/posts", Some(token), json!({ "content": "likeable" })).await;
        uuid::Uuid::parse_str(body["post"]["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_liking_twice_is_rejected() {
        let app = TestApp::new();
        let (me, token) = app.user("ada").await;
        let post_id = post(&app, &token).await;

        let (status, body) = app.post("/likes", Some(&token), json!({ "postId": post_id })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Like created successfully.");
        assert_eq!(body["like"]["user"], me.id.to_string());

        let (status, body) = app.post("/likes", Some(&token), json!({ "postId": post_id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You have already liked this post.");

        let likes = app.store.likes_for_post(post_id).await.unwrap().unwrap();
        assert_eq!(likes.len(), 1);
        let stored = app.store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(stored.likes_count, 1);
    }

    #[tokio::test]
    async fn test_like_uses_caller_not_body_user() {
        let app = TestApp::new();
        let (me, token) = app.user("ada").await;
        let (other, _) = app.user("bob").await;
        let post_id = post(&app, &token).await;

        let (status, body) = app
            .post("/likes", Some(&token), json!({ "postId": post_id, "userId": other.id }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["like"]["user"], me.id.to_string());
    }

    #[tokio::test]
    async fn test_unlike_decrements_counter() {
        let app = TestApp::new();
        let (_, token) = app.user("ada").await;
        let post_id = post(&app, &token).await;
        app.post("/likes", Some(&token), json!({ "postId": post_id })).await;

        let (status, body) = app
            .delete("/likes", Some(&token), Some(json!({ "postId": post_id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Like deleted successfully.");
        let stored = app.store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(stored.likes_count, 0);

        let (status, body) = app
            .delete("/likes", Some(&token), Some(json!({ "postId": post_id })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Like not found.");
        let stored = app.store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(stored.likes_count, 0);
    }

    #[tokio::test]
    async fn test_like_validation_and_missing_post() {
        let app = TestApp::new();
        let (_, token) = app.user("ada").await;

        let (status, body) = app
            .post("/likes", Some(&token), json!({ "postId": "nope", "userId": 5 }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], "Invalid Post ID");
        assert_eq!(body["errors"][1]["msg"], "Invalid User ID");

        let (status, body) = app
            .post("/likes", Some(&token), json!({ "postId": uuid::Uuid::new_v4() }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found!");
    }
}
