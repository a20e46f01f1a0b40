/**
 * Follow Routes
 * Mounted at the root: /follow, /unfollow, /followers, /following
 */
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    auth::AuthUser,
    db::models::{Follow, Followee, Follower},
    error::{ApiError, ApiResult, ErrorKey},
    state::AppState,
    store::StoreError,
    upload::Payload,
    validation::Validator,
};

use super::MessageResponse;

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub message: &'static str,
    pub follow: Follow,
}

#[derive(Debug, Serialize)]
pub struct FollowersResponse {
    pub followers: Vec<Follower>,
}

#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    pub followed: Vec<Followee>,
}

fn followed_id(payload: &Payload) -> ApiResult<uuid::Uuid> {
    let mut v = Validator::new();
    let id = v.body_id_non_empty(
        &payload.body,
        "followedId",
        "Followed id can't be empty.",
        "Must be valid id",
    );
    v.finish()?;
    Ok(id)
}

/// POST /follow
pub async fn follow(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<FollowResponse>)> {
    let followed = followed_id(&payload)?;
    if followed == user.id {
        return Err(ApiError::bad_request("You cannot follow yourself."));
    }
    if state.store.find_user(followed).await?.is_none() {
        return Err(ApiError::not_found("User not found."));
    }

    let follow = match state.store.create_follow(user.id, followed).await {
        Ok(follow) => follow,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::bad_request("You are already following this user."))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(follower = %user.id, followed = %followed, "User followed");
    Ok((
        StatusCode::CREATED,
        Json(FollowResponse {
            message: "Followed successfully.",
            follow,
        }),
    ))
}

/// DELETE /unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> ApiResult<Json<MessageResponse>> {
    let followed = followed_id(&payload)?;
    if !state.store.delete_follow(user.id, followed).await? {
        return Err(ApiError::not_found("Follow relationship not found."));
    }

    tracing::info!(follower = %user.id, followed = %followed, "User unfollowed");
    Ok(Json(MessageResponse::new("Un followed successfully.")))
}

/// GET /followers - Who follows the caller
pub async fn followers(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<FollowersResponse>> {
    let followers = state.store.followers_of(user.id).await.map_err(
        ApiError::store_failure(ErrorKey::Message, "Error during fetching followers"),
    )?;
    if followers.is_empty() {
        return Err(ApiError::not_found("No followers found."));
    }
    Ok(Json(FollowersResponse { followers }))
}

/// GET /following - Who the caller follows
pub async fn following(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<FollowingResponse>> {
    let followed = state.store.following_of(user.id).await.map_err(
        ApiError::store_failure(ErrorKey::Message, "Error during fetching followed users"),
    )?;
    if followed.is_empty() {
        return Err(ApiError::not_found(
            "You are not following anyone at the moment.",
        ));
    }
    Ok(Json(FollowingResponse { followed }))
}

#[cfg(test)]
mod tests {
    use crate::{store::Store, testing::TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_self_follow_is_rejected_and_not_stored() {
        let app = TestApp::new();
        let (me, token) = app.user("ada").await;

        let (status, body) = app.post("/follow", Some(&token), json!({ "followedId": me.id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You cannot follow yourself.");
        assert!(app.store.followed_ids(me.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let app = TestApp::new();
        let (me, token) = app.user("ada").await;
        let (them, their_token) = app.user("grace").await;

        let (status, body) = app
            .post("/follow", Some(&token), json!({ "followedId": them.id }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Followed successfully.");
        assert_eq!(body["follow"]["followed"], them.id.to_string());

        let (status, body) = app
            .post("/follow", Some(&token), json!({ "followedId": them.id }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You are already following this user.");

        let (status, body) = app.get("/following", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["followed"][0]["followed"]["firstName"], "grace");
        assert_eq!(body["followed"][0]["follower"], me.id.to_string());

        let (status, body) = app.get("/followers", Some(&their_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["followers"][0]["follower"]["firstName"], "ada");

        let (status, body) = app
            .delete("/unfollow", Some(&token), Some(json!({ "followedId": them.id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Un followed successfully.");

        let (status, body) = app
            .delete("/unfollow", Some(&token), Some(json!({ "followedId": them.id })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Follow relationship not found.");
    }

    #[tokio::test]
    async fn test_empty_lists_are_404() {
        let app = TestApp::new();
        let (_, token) = app.user("loner").await;

        let (status, body) = app.get("/followers", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No followers found.");

        let (status, body) = app.get("/following", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "You are not following anyone at the moment.");
    }

    #[tokio::test]
    async fn test_follow_validation_and_unknown_user() {
        let app = TestApp::new();
        let (_, token) = app.user("ada").await;

        let (status, body) = app.post("/follow", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], "Followed id can't be empty.");
        assert_eq!(body["errors"][1]["msg"], "Must be valid id");

        let (status, body) = app
            .post("/follow", Some(&token), json!({ "followedId": uuid::Uuid::new_v4() }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found.");
    }
}
