/*!
 * Store
 * Persistence boundary for every entity. Handlers only ever see `Arc<dyn Store>`.
 */
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{
    Comment, Follow, Followee, Follower, LikedPost, Like, Media, NewComment, NewMedia, NewPost,
    NewProfile, NewUser, Page, Post, PostDeletion, PostLike, Profile, ProfileUpdate, User,
    UserSearch, UserUpdate,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Short name used by health checks.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Newest first.
    async fn search_users(&self, search: &UserSearch) -> StoreResult<Page<User>>;
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<Option<User>>;
    /// Replaces personal data with placeholders and deactivates the account.
    async fn anonymize_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    // Profiles
    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn create_profile(&self, profile: NewProfile) -> StoreResult<Profile>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate)
        -> StoreResult<Option<Profile>>;
    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    // Posts
    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>>;
    /// Persists the post and, when present, its media record together.
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn update_post_content(&self, id: Uuid, content: String) -> StoreResult<Option<Post>>;
    /// Removes the post with its comments, likes and media records.
    async fn delete_post(&self, id: Uuid) -> StoreResult<Option<PostDeletion>>;
    /// Posts written by any of `authors`, newest first.
    async fn posts_by_authors(
        &self,
        authors: &[Uuid],
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Post>>;
    async fn count_posts_by_authors(&self, authors: &[Uuid]) -> StoreResult<i64>;
    /// Newest posts written by nobody in `authors`.
    async fn latest_posts_excluding(&self, authors: &[Uuid], limit: i64)
        -> StoreResult<Vec<Post>>;

    // Comments
    /// Oldest first.
    async fn comments_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;

    // Likes
    /// Inserts the like and increments the post's counter atomically.
    async fn create_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Like>;
    /// Removes the like and decrements the post's counter, never below zero.
    /// Returns false when there was no such like.
    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool>;
    /// `None` when the post does not exist.
    async fn likes_for_post(&self, post_id: Uuid) -> StoreResult<Option<Vec<PostLike>>>;
    async fn likes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<LikedPost>>;
    /// Which of `post_ids` the user has liked.
    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid])
        -> StoreResult<HashSet<Uuid>>;

    // Follows
    async fn create_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<Follow>;
    async fn delete_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<bool>;
    async fn followers_of(&self, user_id: Uuid) -> StoreResult<Vec<Follower>>;
    async fn following_of(&self, user_id: Uuid) -> StoreResult<Vec<Followee>>;
    async fn followed_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

    // Media
    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>>;
    async fn create_media(&self, media: NewMedia) -> StoreResult<Media>;
    async fn delete_media(&self, id: Uuid) -> StoreResult<Option<Media>>;
}

/// Postgres reports unique violations with SQLSTATE 23505.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Map a write error, turning unique violations into `Conflict`.
pub(crate) fn conflict_or(err: sqlx::Error, what: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(what.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Placeholder email assigned to an anonymized account; unique per user.
pub fn anonymized_email(id: Uuid) -> String {
    format!("no-reply+{id}@example.com")
}

/// Pages needed for `total` items at `limit` per page.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Rows to skip for a 1-based `page`; saturates so far-off pages read as empty.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(limit.max(0))
}
