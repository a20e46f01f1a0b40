//! Domain models - records returned by the store and the inputs used to write them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

// ============================================================================
// Records
// ============================================================================

/// User model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub github_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub is_guest: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// A user as seen by another (possibly anonymous) user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub is_followed_by_current_user: bool,
}

/// Populated author/user reference
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user: Uuid,
    pub birthday: Option<DateTime<Utc>>,
    pub interests: Vec<String>,
    pub hobby: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Uuid,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub post: Uuid,
    pub public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with its author, media and comment ids populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub author: UserSummary,
    pub media: Vec<Media>,
    pub comments: Vec<Uuid>,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set only on listings made for a specific viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_user: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author: UserSummary,
    pub post: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: Uuid,
    pub user: Uuid,
    pub post: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A like on a post, with the liking user populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostLike {
    pub id: Uuid,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

/// A like made by a user, with the liked post populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedPost {
    pub id: Uuid,
    pub post: Post,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: Uuid,
    pub follower: Uuid,
    pub followed: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Follow record seen from the followed user's side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follower {
    pub id: Uuid,
    pub follower: UserSummary,
    pub followed: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Follow record seen from the follower's side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Followee {
    pub id: Uuid,
    pub follower: Uuid,
    pub followed: UserSummary,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub github_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub is_guest: bool,
}

/// Editable user fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserSearch {
    /// Case-insensitive substring matched against first or last name.
    pub term: Option<String>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user: Uuid,
    pub birthday: Option<DateTime<Utc>>,
    pub interests: Vec<String>,
    pub hobby: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub birthday: Option<DateTime<Utc>>,
    pub interests: Option<Vec<String>>,
    pub hobby: Option<Vec<String>>,
}

/// A remote object already uploaded to media storage.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: Uuid,
    pub content: String,
    pub media: Option<StoredMedia>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: Uuid,
    pub post: Uuid,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub post: Uuid,
    pub media: StoredMedia,
}

/// What a cascading post delete removed.
#[derive(Debug, Clone)]
pub struct PostDeletion {
    pub post: Post,
    pub deleted_comments: u64,
    pub deleted_likes: u64,
    pub deleted_media: Vec<Media>,
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            github_id: "42".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            profile_picture: Some("https://img/ada.png".to_string()),
            cover_photo: None,
            bio: None,
            role: ROLE_USER.to_string(),
            is_guest: false,
            is_active: true,
            date_joined: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_view_flattens_follow_flag() {
        let view = UserView {
            user: sample_user(),
            is_followed_by_current_user: true,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isFollowedByCurrentUser"], true);
        assert_eq!(json["githubId"], "42");
    }

    #[test]
    fn test_post_omits_liked_flag_when_unset() {
        let user = sample_user();
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            content: "hello".to_string(),
            author: user.summary(),
            media: vec![],
            comments: vec![],
            likes_count: 0,
            created_at: now,
            updated_at: now,
            liked_by_user: None,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("likedByUser").is_none());
        assert_eq!(json["likesCount"], 0);
        assert_eq!(json["author"]["firstName"], "Ada");
    }

    #[test]
    fn test_media_kind_serializes_as_type() {
        let now = Utc::now();
        let media = Media {
            id: Uuid::new_v4(),
            url: "https://cdn/x.png".to_string(),
            kind: MediaKind::Image,
            post: Uuid::new_v4(),
            public_id: Some("folder/x".to_string()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["publicId"], "folder/x");
        assert_eq!(MediaKind::parse("video"), Some(MediaKind::Video));
        assert_eq!(MediaKind::parse("gif"), None);
    }
}
