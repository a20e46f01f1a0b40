/**
 * Profile Routes
 * Extended personal details; one profile per user.
 *
 * `GET /profile/{id}` looks up by user id while `PUT` and `DELETE` address
 * the profile itself.
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::{can_modify, AuthUser},
    db::models::{NewProfile, Profile, ProfileUpdate},
    error::{ApiError, ApiResult},
    state::AppState,
    store::StoreError,
    upload::Payload,
    validation::{parse_iso_date, path_id, string_array, Location, Validator},
};

const PROFILE_NOT_FOUND: &str = "Profile not found!";
const UNAUTHORIZED: &str = "Unauthorized action!";
const INVALID_PROFILE_ID: &str = "Profile ID must be a valid id.";

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct DeleteProfileResponse {
    pub message: &'static str,
    pub profile: Profile,
}

fn validate_details(v: &mut Validator, payload: &Payload) -> ProfileUpdate {
    let birthday = payload.get("birthday").and_then(|value| {
        let parsed: Option<DateTime<Utc>> = value.as_str().and_then(parse_iso_date);
        v.check(
            parsed.is_some(),
            Location::Body,
            "birthday",
            Some(value),
            "Birthday must be a valid ISO 8601 date.",
        );
        parsed
    });

    let mut list = |key: &str, msg: &str| {
        payload.get(key).and_then(|value| {
            let items = string_array(value);
            v.check(items.is_some(), Location::Body, key, Some(value), msg);
            items
        })
    };
    let interests = list("interests", "Interests must be an array.");
    let hobby = list("hobby", "Hobby must be an array.");

    ProfileUpdate {
        birthday,
        interests,
        hobby,
    }
}

async fn owned_profile(state: &AppState, actor: &AuthUser, raw_id: &str) -> ApiResult<Profile> {
    let id = path_id("profileId", raw_id, INVALID_PROFILE_ID)?;
    let profile = state
        .store
        .find_profile(id)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
    if !can_modify(actor, profile.user) {
        return Err(ApiError::forbidden(UNAUTHORIZED));
    }
    Ok(profile)
}

/// GET /profile/{userId}
pub async fn get_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let user_id = path_id("userId", &user_id, "User ID must be a valid id.")?;
    let profile = state
        .store
        .find_profile_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
    Ok(Json(ProfileResponse { profile }))
}

/// POST /profile
pub async fn create_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    let mut v = Validator::new();
    let user: Uuid = v.body_id(&payload.body, "user", "User ID must be a valid id.");
    let details = validate_details(&mut v, &payload);
    v.finish()?;

    if !can_modify(&actor, user) {
        return Err(ApiError::forbidden(UNAUTHORIZED));
    }
    if state.store.find_user(user).await?.is_none() {
        return Err(ApiError::not_found("User not found."));
    }

    let already_exists = || ApiError::bad_request("Profile already exists for this user.");
    if state.store.find_profile_by_user(user).await?.is_some() {
        return Err(already_exists());
    }

    let profile = match state
        .store
        .create_profile(NewProfile {
            user,
            birthday: details.birthday,
            interests: details.interests.unwrap_or_default(),
            hobby: details.hobby.unwrap_or_default(),
        })
        .await
    {
        Ok(profile) => profile,
        Err(StoreError::Conflict(_)) => return Err(already_exists()),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(profile_id = %profile.id, user_id = %user, "Profile created");
    Ok((StatusCode::CREATED, Json(ProfileResponse { profile })))
}

/// PUT /profile/{profileId}
pub async fn update_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(profile_id): Path<String>,
    payload: Payload,
) -> ApiResult<Json<ProfileResponse>> {
    let mut v = Validator::new();
    let update = validate_details(&mut v, &payload);
    v.finish()?;

    let existing = owned_profile(&state, &actor, &profile_id).await?;
    let profile = state
        .store
        .update_profile(existing.id, update)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
    Ok(Json(ProfileResponse { profile }))
}

/// DELETE /profile/{profileId}
pub async fn delete_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(profile_id): Path<String>,
) -> ApiResult<Json<DeleteProfileResponse>> {
    let existing = owned_profile(&state, &actor, &profile_id).await?;
    let profile = state
        .store
        .delete_profile(existing.id)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;

    tracing::info!(profile_id = %profile.id, "Profile deleted");
    Ok(Json(DeleteProfileResponse {
        message: "Profile deleted",
        profile,
    }))
}
