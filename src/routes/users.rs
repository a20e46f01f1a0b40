/**
 * User Routes
 * Search, profile pages, account updates and anonymizing deletes
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::{can_modify, AuthUser, MaybeAuthUser},
    db::models::{LikedPost, Post, User, UserSearch, UserUpdate, UserView},
    error::{ApiError, ApiResult, ErrorKey},
    feed::annotate_likes,
    state::AppState,
    store::total_pages,
    upload::{Payload, UploadError},
    validation::{char_len, escape_html, is_valid_search, pagination, path_id, Location, Validator},
};

const INVALID_USER_ID: &str = "User ID must be a valid id.";
const USER_NOT_FOUND: &str = "User not found.";
const PROFILE_IMAGE_FIELDS: [&str; 2] = ["profilePicture", "coverPhoto"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_users: i64,
}

#[derive(Debug, Serialize)]
pub struct UserResponse<T: Serialize> {
    pub user: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPostsResponse {
    pub posts: Vec<Post>,
    pub total_posts: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLikesResponse {
    pub likes: Vec<LikedPost>,
    pub likes_count: usize,
}

fn user_not_found() -> ApiError {
    ApiError::error(StatusCode::NOT_FOUND, USER_NOT_FOUND)
}

/// GET /users - Search users by name, newest first
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<UserListResponse>> {
    let mut v = Validator::new();
    let term = query.get("q").map(|q| q.trim().to_string());
    if let Some(term) = &term {
        let value = Value::from(term.as_str());
        v.check(
            (1..=50).contains(&char_len(term)),
            Location::Query,
            "q",
            Some(&value),
            "Search query must be between 1 and 50 characters long",
        )
        .check(
            is_valid_search(term),
            Location::Query,
            "q",
            Some(&value),
            "Search query contains invalid characters",
        );
    }
    let (page, limit) = pagination(&mut v, &query);
    v.finish()?;

    let found = state
        .store
        .search_users(&UserSearch { term, page, limit })
        .await?;
    if found.items.is_empty() {
        return Err(ApiError::error(StatusCode::NOT_FOUND, "Users not found."));
    }

    let followed = match &viewer {
        Some(viewer) => state.store.followed_ids(viewer.id).await?,
        None => Vec::new(),
    };
    let users = found
        .items
        .into_iter()
        .map(|user| UserView {
            is_followed_by_current_user: followed.contains(&user.id),
            user,
        })
        .collect();

    Ok(Json(UserListResponse {
        users,
        current_page: page,
        total_pages: total_pages(found.total, limit),
        total_users: found.total,
    }))
}

/// GET /users/{userId}
pub async fn get_user(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse<UserView>>> {
    let user_id = path_id("userId", &user_id, INVALID_USER_ID)?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let followed = state.store.followed_ids(viewer.id).await?;
    Ok(Json(UserResponse {
        user: UserView {
            is_followed_by_current_user: followed.contains(&user.id),
            user,
        },
    }))
}

/// GET /users/{userId}/posts - Everything the user wrote, newest first
pub async fn get_user_posts(
    State(state): State<AppState>,
    viewer: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserPostsResponse>> {
    let user_id = path_id("userId", &user_id, INVALID_USER_ID)?;
    if state.store.find_user(user_id).await?.is_none() {
        return Err(user_not_found());
    }

    let mut posts = state
        .store
        .posts_by_authors(&[user_id], 0, i64::MAX)
        .await?;
    annotate_likes(state.store.as_ref(), viewer.id, &mut posts).await?;

    Ok(Json(UserPostsResponse {
        total_posts: posts.len(),
        posts,
    }))
}

/// GET /users/{userId}/likes - Posts the user liked
pub async fn get_user_likes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserLikesResponse>> {
    let user_id = path_id("userId", &user_id, INVALID_USER_ID)?;
    let likes = state.store.likes_by_user(user_id).await?;
    if likes.is_empty() {
        return Err(ApiError::error(
            StatusCode::NOT_FOUND,
            "This user has no liked posts yet.",
        ));
    }

    Ok(Json(UserLikesResponse {
        likes_count: likes.len(),
        likes,
    }))
}

/// Trimmed, escaped text field; `None` when absent.
fn text_field(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).map(|value| match value.as_str() {
        Some(s) => escape_html(s.trim()),
        None => escape_html(&value.to_string()),
    })
}

fn validate_update(v: &mut Validator, payload: &Payload) -> UserUpdate {
    let first_name = text_field(payload, "firstName").unwrap_or_default();
    let value = Value::from(first_name.as_str());
    if first_name.is_empty() {
        v.push(Location::Body, "firstName", Some(value.clone()), "First name cannot be empty.");
    }
    v.check(
        (2..=15).contains(&char_len(&first_name)),
        Location::Body,
        "firstName",
        Some(&value),
        "First name must be between 2 and 15 characters long.",
    );

    let last_name = text_field(payload, "lastName");
    if let Some(last_name) = &last_name {
        v.check(
            (2..=20).contains(&char_len(last_name)),
            Location::Body,
            "lastName",
            Some(&Value::from(last_name.as_str())),
            "Last name must be between 2 and 20 characters long.",
        );
    }

    let bio = text_field(payload, "bio");
    if let Some(bio) = &bio {
        v.check(
            char_len(bio) <= 500,
            Location::Body,
            "bio",
            Some(&Value::from(bio.as_str())),
            "Bio must be less than 500 characters long.",
        );
    }

    let profile_picture = payload
        .get("profilePicture")
        .map(|value| value.as_str().unwrap_or_default().trim().to_string());
    if let Some(url) = &profile_picture {
        v.check(
            !url.is_empty(),
            Location::Body,
            "profilePicture",
            Some(&Value::from(url.as_str())),
            "Profile picture URL cannot be empty.",
        );
    }

    UserUpdate {
        first_name,
        last_name,
        bio,
        profile_picture,
        cover_photo: None,
    }
}

/// PUT /users/{userId} - Update names, bio and pictures
pub async fn update_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(user_id): Path<String>,
    mut payload: Payload,
) -> ApiResult<Json<UserResponse<User>>> {
    let mut v = Validator::new();
    let user_id = v.param_id("userId", &user_id, INVALID_USER_ID);
    let mut update = validate_update(&mut v, &payload);
    v.finish()?;

    if !can_modify(&actor, user_id) {
        return Err(ApiError::error(
            StatusCode::FORBIDDEN,
            "You do not have permission to update this profile.",
        ));
    }

    payload
        .ensure_files(&PROFILE_IMAGE_FIELDS, 2)
        .map_err(UploadError::photo)?;
    if let Some(file) = payload.take_file("profilePicture") {
        update.profile_picture = Some(state.media.upload(&file).await?.url);
    }
    if let Some(file) = payload.take_file("coverPhoto") {
        update.cover_photo = Some(state.media.upload(&file).await?.url);
    }

    let user = state
        .store
        .update_user(user_id, update)
        .await
        .map_err(ApiError::store_failure(
            ErrorKey::Error,
            "Something went wrong during the update.",
        ))?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, "User updated");
    Ok(Json(UserResponse { user }))
}

/// DELETE /users/{userId} - Anonymize the account
pub async fn delete_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse<User>>> {
    let user_id: Uuid = path_id("userId", &user_id, INVALID_USER_ID)?;
    if !can_modify(&actor, user_id) {
        return Err(ApiError::error(
            StatusCode::FORBIDDEN,
            "You do not have permission to delete this account.",
        ));
    }

    let user = state
        .store
        .anonymize_user(user_id)
        .await
        .map_err(ApiError::store_failure(
            ErrorKey::Error,
            "Something went wrong during the deletion process.",
        ))?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, "User anonymized");
    Ok(Json(UserResponse { user }))
}
