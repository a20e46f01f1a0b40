/*!
 * PostgreSQL store
 * sqlx queries against the schema created by `db::run_migrations`.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{anonymized_email, conflict_or, page_offset, Store, StoreError, StoreResult};
use crate::db::{
    self,
    models::{
        Comment, Follow, Followee, Follower, Like, LikedPost, Media, MediaKind, NewComment,
        NewMedia, NewPost, NewProfile, NewUser, Page, Post, PostDeletion, PostLike, Profile,
        ProfileUpdate, User, UserSearch, UserSummary, UserUpdate,
    },
};

const USER_COLUMNS: &str = "id, github_id, first_name, last_name, email, profile_picture, \
     cover_photo, bio, role, is_guest, is_active, date_joined, created_at, updated_at";

const PROFILE_COLUMNS: &str =
    r#"id, user_id AS "user", birthday, interests, hobby, created_at, updated_at"#;

const MEDIA_COLUMNS: &str =
    "id, url, type AS kind, post_id, public_id, created_at, updated_at";

const POST_SELECT: &str = r#"
    SELECT p.id, p.content, p.likes_count, p.created_at, p.updated_at,
           u.id AS author_id, u.first_name AS author_first_name,
           u.last_name AS author_last_name, u.profile_picture AS author_profile_picture
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.post_id, c.created_at, c.updated_at,
           u.id AS author_id, u.first_name AS author_first_name,
           u.last_name AS author_last_name, u.profile_picture AS author_profile_picture
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    content: String,
    likes_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    author_first_name: String,
    author_last_name: String,
    author_profile_picture: Option<String>,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    content: String,
    post_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    author_first_name: String,
    author_last_name: String,
    author_profile_picture: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            author: UserSummary {
                id: row.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                profile_picture: row.author_profile_picture,
            },
            post: row.post_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MediaRow {
    id: Uuid,
    url: String,
    kind: String,
    post_id: Uuid,
    public_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MediaRow> for Media {
    fn from(row: MediaRow) -> Self {
        Media {
            id: row.id,
            url: row.url,
            kind: MediaKind::parse(&row.kind).unwrap_or(MediaKind::Image),
            post: row.post_id,
            public_id: row.public_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A like or follow row joined with one user's summary columns.
#[derive(Debug, FromRow)]
struct JoinedRow {
    id: Uuid,
    other_id: Uuid,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    first_name: String,
    last_name: String,
    profile_picture: Option<String>,
}

impl JoinedRow {
    fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach media and comment ids to a batch of post rows, keeping row order.
    async fn hydrate(&self, rows: Vec<PostRow>) -> StoreResult<Vec<Post>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let media_rows = sqlx::query_as::<_, MediaRow>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE post_id = ANY($1) ORDER BY created_at"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comment_ids: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT id, post_id FROM comments WHERE post_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut media: HashMap<Uuid, Vec<Media>> = HashMap::new();
        for row in media_rows {
            media.entry(row.post_id).or_default().push(row.into());
        }
        let mut comments: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (comment_id, post_id) in comment_ids {
            comments.entry(post_id).or_default().push(comment_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| Post {
                media: media.remove(&row.id).unwrap_or_default(),
                comments: comments.remove(&row.id).unwrap_or_default(),
                id: row.id,
                content: row.content,
                author: UserSummary {
                    id: row.author_id,
                    first_name: row.author_first_name,
                    last_name: row.author_last_name,
                    profile_picture: row.author_profile_picture,
                },
                likes_count: row.likes_count,
                created_at: row.created_at,
                updated_at: row.updated_at,
                liked_by_user: None,
            })
            .collect())
    }

    async fn posts_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        db::health_check(&self.pool).await?;
        Ok(())
    }

    // ------------------------------------------------------------------ users

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE github_id = $1"
        ))
        .bind(github_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (github_id, first_name, last_name, email, profile_picture, bio, role, is_guest)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.github_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.profile_picture)
        .bind(&new.bio)
        .bind(&new.role)
        .bind(new.is_guest)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "user"))
    }

    async fn search_users(&self, search: &UserSearch) -> StoreResult<Page<User>> {
        let pattern = search.term.as_ref().map(|t| format!("%{t}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::TEXT IS NULL OR first_name ILIKE $1 OR last_name ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE $1::TEXT IS NULL OR first_name ILIKE $1 OR last_name ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(search.limit)
        .bind(page_offset(search.page, search.limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = $2,
                last_name = COALESCE($3, last_name),
                bio = COALESCE($4, bio),
                profile_picture = COALESCE($5, profile_picture),
                cover_photo = COALESCE($6, cover_photo),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.bio)
        .bind(&update.profile_picture)
        .bind(&update.cover_photo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn anonymize_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = 'Anonymous',
                last_name = '',
                email = $2,
                bio = '',
                profile_picture = '',
                cover_photo = '',
                is_active = false,
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(anonymized_email(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "user email"))?;
        Ok(user)
    }

    // --------------------------------------------------------------- profiles

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn create_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (user_id, birthday, interests, hobby)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(new.user)
        .bind(new.birthday)
        .bind(&new.interests)
        .bind(&new.hobby)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "profile"))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles SET
                birthday = COALESCE($2, birthday),
                interests = COALESCE($3, interests),
                hobby = COALESCE($4, hobby),
                updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.birthday)
        .bind(&update.interests)
        .bind(&update.hobby)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "DELETE FROM profiles WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    // ------------------------------------------------------------------ posts

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.posts_by_ids(&[id]).await?.into_iter().next())
    }

    async fn create_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let post_id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, content) VALUES ($1, $2) RETURNING id",
        )
        .bind(new.author)
        .bind(&new.content)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(stored) = &new.media {
            sqlx::query(
                "INSERT INTO media (post_id, url, type, public_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(post_id)
            .bind(&stored.url)
            .bind(stored.kind.as_str())
            .bind(&stored.public_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_post(post_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_post_content(&self, id: Uuid, content: String) -> StoreResult<Option<Post>> {
        let updated = sqlx::query("UPDATE posts SET content = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(&content)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_post(id).await
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<Option<PostDeletion>> {
        let Some(post) = self.find_post(id).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;

        let deleted_comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted_likes = sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted_media = sqlx::query_as::<_, MediaRow>(&format!(
            "DELETE FROM media WHERE post_id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Media::from)
        .collect();

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(PostDeletion {
            post,
            deleted_comments,
            deleted_likes,
            deleted_media,
        }))
    }

    async fn posts_by_authors(
        &self,
        authors: &[Uuid],
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT} WHERE p.author_id = ANY($1) ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(authors)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn count_posts_by_authors(&self, authors: &[Uuid]) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ANY($1)")
            .bind(authors)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn latest_posts_excluding(
        &self,
        authors: &[Uuid],
        limit: i64,
    ) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT} WHERE NOT (p.author_id = ANY($1)) ORDER BY p.created_at DESC LIMIT $2"
        ))
        .bind(authors)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    // --------------------------------------------------------------- comments

    async fn comments_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Comment::from))
    }

    async fn create_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO comments (author_id, post_id, content) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(new.author)
        .bind(new.post)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;

        self.find_comment(id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------ likes

    async fn create_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Like> {
        let mut tx = self.pool.begin().await?;

        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (user_id, post_id) VALUES ($1, $2)
            RETURNING id, user_id AS "user", post_id AS post, created_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or(e, "like"))?;

        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(like)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn likes_for_post(&self, post_id: Uuid) -> StoreResult<Option<Vec<PostLike>>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT l.id, l.post_id AS other_id, l.created_at,
                   u.id AS user_id, u.first_name, u.last_name, u.profile_picture
            FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.post_id = $1
            ORDER BY l.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(
            rows.iter()
                .map(|row| PostLike {
                    id: row.id,
                    user: row.summary(),
                    created_at: row.created_at,
                })
                .collect(),
        ))
    }

    async fn likes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<LikedPost>> {
        let likes: Vec<(Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, post_id, created_at FROM likes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let post_ids: Vec<Uuid> = likes.iter().map(|(_, post_id, _)| *post_id).collect();
        let mut posts: HashMap<Uuid, Post> = self
            .posts_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(likes
            .into_iter()
            .filter_map(|(id, post_id, created_at)| {
                posts.remove(&post_id).map(|post| LikedPost {
                    id,
                    post,
                    created_at,
                })
            })
            .collect())
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)")
                .bind(user_id)
                .bind(post_ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    // ---------------------------------------------------------------- follows

    async fn create_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<Follow> {
        sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)
            RETURNING id, follower_id AS follower, followed_id AS followed, created_at
            "#,
        )
        .bind(follower)
        .bind(followed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "follow"))
    }

    async fn delete_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower)
            .bind(followed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn followers_of(&self, user_id: Uuid) -> StoreResult<Vec<Follower>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT f.id, f.followed_id AS other_id, f.created_at,
                   u.id AS user_id, u.first_name, u.last_name, u.profile_picture
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = $1
            ORDER BY f.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Follower {
                id: row.id,
                follower: row.summary(),
                followed: row.other_id,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn following_of(&self, user_id: Uuid) -> StoreResult<Vec<Followee>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT f.id, f.follower_id AS other_id, f.created_at,
                   u.id AS user_id, u.first_name, u.last_name, u.profile_picture
            FROM follows f
            JOIN users u ON u.id = f.followed_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Followee {
                id: row.id,
                follower: row.other_id,
                followed: row.summary(),
                created_at: row.created_at,
            })
            .collect())
    }

    async fn followed_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT followed_id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    // ------------------------------------------------------------------ media

    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Media::from))
    }

    async fn create_media(&self, new: NewMedia) -> StoreResult<Media> {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            r#"
            INSERT INTO media (post_id, url, type, public_id) VALUES ($1, $2, $3, $4)
            RETURNING {MEDIA_COLUMNS}
            "#
        ))
        .bind(new.post)
        .bind(&new.media.url)
        .bind(new.media.kind.as_str())
        .bind(&new.media.public_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            "DELETE FROM media WHERE id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Media::from))
    }
}
