/*!
 * In-memory store
 * Used when no database is configured and by the test suite. Rows live in
 * insertion order, so "newest first" is reverse iteration.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{anonymized_email, page_offset, Store, StoreError, StoreResult};
use crate::db::models::{
    Comment, Follow, Followee, Follower, Like, LikedPost, Media, NewComment, NewMedia, NewPost,
    NewProfile, NewUser, Page, Post, PostDeletion, PostLike, Profile, ProfileUpdate, User,
    UserSearch, UserSummary, UserUpdate,
};

#[derive(Debug, Clone)]
struct PostRow {
    id: Uuid,
    author: Uuid,
    content: String,
    likes_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: Uuid,
    author: Uuid,
    post: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    posts: Vec<PostRow>,
    comments: Vec<CommentRow>,
    likes: Vec<Like>,
    follows: Vec<Follow>,
    media: Vec<Media>,
}

impl Tables {
    fn summary(&self, user_id: Uuid) -> UserSummary {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(User::summary)
            .unwrap_or_else(|| UserSummary {
                id: user_id,
                first_name: String::new(),
                last_name: String::new(),
                profile_picture: None,
            })
    }

    fn hydrate_post(&self, row: &PostRow) -> Post {
        Post {
            id: row.id,
            content: row.content.clone(),
            author: self.summary(row.author),
            media: self
                .media
                .iter()
                .filter(|m| m.post == row.id)
                .cloned()
                .collect(),
            comments: self
                .comments
                .iter()
                .filter(|c| c.post == row.id)
                .map(|c| c.id)
                .collect(),
            likes_count: row.likes_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            liked_by_user: None,
        }
    }

    fn hydrate_comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            content: row.content.clone(),
            author: self.summary(row.author),
            post: row.post,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn find_post(&self, id: Uuid) -> Option<Post> {
        self.posts
            .iter()
            .find(|p| p.id == id)
            .map(|row| self.hydrate_post(row))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ------------------------------------------------------------------ users

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_github_id(&self, github_id: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.github_id == github_id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.github_id == new.github_id) {
            return Err(StoreError::Conflict("user".to_string()));
        }
        if let Some(email) = &new.email {
            if t.users.iter().any(|u| u.email.as_ref() == Some(email)) {
                return Err(StoreError::Conflict("user email".to_string()));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            github_id: new.github_id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            profile_picture: new.profile_picture,
            cover_photo: None,
            bio: new.bio,
            role: new.role,
            is_guest: new.is_guest,
            is_active: true,
            date_joined: now,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn search_users(&self, search: &UserSearch) -> StoreResult<Page<User>> {
        let t = self.tables.read().await;
        let matching: Vec<&User> = t
            .users
            .iter()
            .rev()
            .filter(|u| match &search.term {
                Some(term) => contains_ci(&u.first_name, term) || contains_ci(&u.last_name, term),
                None => true,
            })
            .collect();

        let offset =
            usize::try_from(page_offset(search.page, search.limit)).unwrap_or(usize::MAX);
        Ok(Page {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(search.limit.max(0) as usize)
                .cloned()
                .collect(),
        })
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        user.first_name = update.first_name;
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture);
        }
        if let Some(cover) = update.cover_photo {
            user.cover_photo = Some(cover);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn anonymize_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        user.first_name = "Anonymous".to_string();
        user.last_name = String::new();
        user.email = Some(anonymized_email(id));
        user.bio = Some(String::new());
        user.profile_picture = Some(String::new());
        user.cover_photo = Some(String::new());
        user.is_active = false;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    // --------------------------------------------------------------- profiles

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let t = self.tables.read().await;
        Ok(t.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let t = self.tables.read().await;
        Ok(t.profiles.iter().find(|p| p.user == user_id).cloned())
    }

    async fn create_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        let mut t = self.tables.write().await;
        if t.profiles.iter().any(|p| p.user == new.user) {
            return Err(StoreError::Conflict("profile".to_string()));
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            user: new.user,
            birthday: new.birthday,
            interests: new.interests,
            hobby: new.hobby,
            created_at: now,
            updated_at: now,
        };
        t.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> StoreResult<Option<Profile>> {
        let mut t = self.tables.write().await;
        let Some(profile) = t.profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(birthday) = update.birthday {
            profile.birthday = Some(birthday);
        }
        if let Some(interests) = update.interests {
            profile.interests = interests;
        }
        if let Some(hobby) = update.hobby {
            profile.hobby = hobby;
        }
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let mut t = self.tables.write().await;
        let Some(pos) = t.profiles.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        Ok(Some(t.profiles.remove(pos)))
    }

    // ------------------------------------------------------------------ posts

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let t = self.tables.read().await;
        Ok(t.find_post(id))
    }

    async fn create_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let row = PostRow {
            id: Uuid::new_v4(),
            author: new.author,
            content: new.content,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        };

        if let Some(stored) = new.media {
            t.media.push(Media {
                id: Uuid::new_v4(),
                url: stored.url,
                kind: stored.kind,
                post: row.id,
                public_id: Some(stored.public_id),
                created_at: now,
                updated_at: now,
            });
        }
        t.posts.push(row.clone());
        Ok(t.hydrate_post(&row))
    }

    async fn update_post_content(&self, id: Uuid, content: String) -> StoreResult<Option<Post>> {
        let mut t = self.tables.write().await;
        let Some(row) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.content = content;
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(Some(t.hydrate_post(&row)))
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<Option<PostDeletion>> {
        let mut t = self.tables.write().await;
        let Some(post) = t.find_post(id) else {
            return Ok(None);
        };

        let comments_before = t.comments.len();
        t.comments.retain(|c| c.post != id);
        let deleted_comments = (comments_before - t.comments.len()) as u64;

        let likes_before = t.likes.len();
        t.likes.retain(|l| l.post != id);
        let deleted_likes = (likes_before - t.likes.len()) as u64;

        let (deleted_media, kept): (Vec<Media>, Vec<Media>) =
            std::mem::take(&mut t.media).into_iter().partition(|m| m.post == id);
        t.media = kept;

        t.posts.retain(|p| p.id != id);

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
        let t = self.tables.read().await;
        Ok(t.posts
            .iter()
            .rev()
            .filter(|p| authors.contains(&p.author))
            .skip(usize::try_from(offset.max(0)).unwrap_or(usize::MAX))
            .take(limit.max(0) as usize)
            .map(|row| t.hydrate_post(row))
            .collect())
    }

    async fn count_posts_by_authors(&self, authors: &[Uuid]) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.posts.iter().filter(|p| authors.contains(&p.author)).count() as i64)
    }

    async fn latest_posts_excluding(
        &self,
        authors: &[Uuid],
        limit: i64,
    ) -> StoreResult<Vec<Post>> {
        let t = self.tables.read().await;
        Ok(t.posts
            .iter()
            .rev()
            .filter(|p| !authors.contains(&p.author))
            .take(limit.max(0) as usize)
            .map(|row| t.hydrate_post(row))
            .collect())
    }

    // --------------------------------------------------------------- comments

    async fn comments_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments
            .iter()
            .filter(|c| c.post == post_id)
            .map(|row| t.hydrate_comment(row))
            .collect())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments
            .iter()
            .find(|c| c.id == id)
            .map(|row| t.hydrate_comment(row)))
    }

    async fn create_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let row = CommentRow {
            id: Uuid::new_v4(),
            author: new.author,
            post: new.post,
            content: new.content,
            created_at: now,
            updated_at: now,
        };
        t.comments.push(row.clone());
        Ok(t.hydrate_comment(&row))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id);
        Ok(t.comments.len() < before)
    }

    // ------------------------------------------------------------------ likes

    async fn create_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Like> {
        let mut t = self.tables.write().await;
        if t.likes.iter().any(|l| l.user == user_id && l.post == post_id) {
            return Err(StoreError::Conflict("like".to_string()));
        }

        let like = Like {
            id: Uuid::new_v4(),
            user: user_id,
            post: post_id,
            created_at: Utc::now(),
        };
        t.likes.push(like.clone());
        if let Some(post) = t.posts.iter_mut().find(|p| p.id == post_id) {
            post.likes_count += 1;
        }
        Ok(like)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let Some(pos) = t
            .likes
            .iter()
            .position(|l| l.user == user_id && l.post == post_id)
        else {
            return Ok(false);
        };

        t.likes.remove(pos);
        if let Some(post) = t.posts.iter_mut().find(|p| p.id == post_id) {
            post.likes_count = (post.likes_count - 1).max(0);
        }
        Ok(true)
    }

    async fn likes_for_post(&self, post_id: Uuid) -> StoreResult<Option<Vec<PostLike>>> {
        let t = self.tables.read().await;
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Ok(None);
        }
        Ok(Some(
            t.likes
                .iter()
                .filter(|l| l.post == post_id)
                .map(|l| PostLike {
                    id: l.id,
                    user: t.summary(l.user),
                    created_at: l.created_at,
                })
                .collect(),
        ))
    }

    async fn likes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<LikedPost>> {
        let t = self.tables.read().await;
        Ok(t.likes
            .iter()
            .rev()
            .filter(|l| l.user == user_id)
            .filter_map(|l| {
                t.find_post(l.post).map(|post| LikedPost {
                    id: l.id,
                    post,
                    created_at: l.created_at,
                })
            })
            .collect())
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let t = self.tables.read().await;
        Ok(t.likes
            .iter()
            .filter(|l| l.user == user_id && post_ids.contains(&l.post))
            .map(|l| l.post)
            .collect())
    }

    // ---------------------------------------------------------------- follows

    async fn create_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<Follow> {
        let mut t = self.tables.write().await;
        if t.follows
            .iter()
            .any(|f| f.follower == follower && f.followed == followed)
        {
            return Err(StoreError::Conflict("follow".to_string()));
        }

        let follow = Follow {
            id: Uuid::new_v4(),
            follower,
            followed,
            created_at: Utc::now(),
        };
        t.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_follow(&self, follower: Uuid, followed: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.follows.len();
        t.follows
            .retain(|f| !(f.follower == follower && f.followed == followed));
        Ok(t.follows.len() < before)
    }

    async fn followers_of(&self, user_id: Uuid) -> StoreResult<Vec<Follower>> {
        let t = self.tables.read().await;
        Ok(t.follows
            .iter()
            .filter(|f| f.followed == user_id)
            .map(|f| Follower {
                id: f.id,
                follower: t.summary(f.follower),
                followed: f.followed,
                created_at: f.created_at,
            })
            .collect())
    }

    async fn following_of(&self, user_id: Uuid) -> StoreResult<Vec<Followee>> {
        let t = self.tables.read().await;
        Ok(t.follows
            .iter()
            .filter(|f| f.follower == user_id)
            .map(|f| Followee {
                id: f.id,
                follower: f.follower,
                followed: t.summary(f.followed),
                created_at: f.created_at,
            })
            .collect())
    }

    async fn followed_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let t = self.tables.read().await;
        Ok(t.follows
            .iter()
            .filter(|f| f.follower == user_id)
            .map(|f| f.followed)
            .collect())
    }

    // ------------------------------------------------------------------ media

    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let t = self.tables.read().await;
        Ok(t.media.iter().find(|m| m.id == id).cloned())
    }

    async fn create_media(&self, new: NewMedia) -> StoreResult<Media> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let media = Media {
            id: Uuid::new_v4(),
            url: new.media.url,
            kind: new.media.kind,
            post: new.post,
            public_id: Some(new.media.public_id),
            created_at: now,
            updated_at: now,
        };
        t.media.push(media.clone());
        Ok(media)
    }

    async fn delete_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let mut t = self.tables.write().await;
        let Some(pos) = t.media.iter().position(|m| m.id == id) else {
            return Ok(None);
        };
        Ok(Some(t.media.remove(pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MediaKind, StoredMedia, ROLE_USER};

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                github_id: format!("gh-{name}"),
                first_name: name.to_string(),
                last_name: "Tester".to_string(),
                email: None,
                profile_picture: None,
                bio: None,
                role: ROLE_USER.to_string(),
                is_guest: false,
            })
            .await
            .unwrap()
    }

    async fn post(store: &MemoryStore, author: Uuid, content: &str) -> Post {
        store
            .create_post(NewPost {
                author,
                content: content.to_string(),
                media: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_github_id_conflicts() {
        let store = MemoryStore::new();
        user(&store, "ada").await;
        let err = store
            .create_user(NewUser {
                github_id: "gh-ada".to_string(),
                first_name: "Other".to_string(),
                last_name: String::new(),
                email: None,
                profile_picture: None,
                bio: None,
                role: ROLE_USER.to_string(),
                is_guest: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_like_counter_tracks_creates_and_deletes() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;
        let p = post(&store, author.id, "hello").await;

        let mut likers = Vec::new();
        for name in ["bob", "cy", "di"] {
            let u = user(&store, name).await;
            store.create_like(u.id, p.id).await.unwrap();
            likers.push(u);
        }
        assert!(store.delete_like(likers[0].id, p.id).await.unwrap());

        let post = store.find_post(p.id).await.unwrap().unwrap();
        assert_eq!(post.likes_count, 2);

        // Second delete of the same pair finds nothing and leaves the counter alone.
        assert!(!store.delete_like(likers[0].id, p.id).await.unwrap());
        let post = store.find_post(p.id).await.unwrap().unwrap();
        assert_eq!(post.likes_count, 2);
    }

    #[tokio::test]
    async fn test_double_like_conflicts() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;
        let p = post(&store, author.id, "hello").await;

        store.create_like(author.id, p.id).await.unwrap();
        let err = store.create_like(author.id, p.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let likes = store.likes_for_post(p.id).await.unwrap().unwrap();
        assert_eq!(likes.len(), 1);
    }

    #[tokio::test]
    async fn test_likes_for_missing_post_is_none() {
        let store = MemoryStore::new();
        assert!(store.likes_for_post(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;
        let p = store
            .create_post(NewPost {
                author: author.id,
                content: "with picture".to_string(),
                media: Some(StoredMedia {
                    url: "https://cdn/x.png".to_string(),
                    public_id: "odin-book/x".to_string(),
                    kind: MediaKind::Image,
                }),
            })
            .await
            .unwrap();
        assert_eq!(p.media.len(), 1);

        store
            .create_comment(NewComment {
                author: author.id,
                post: p.id,
                content: "first".to_string(),
            })
            .await
            .unwrap();
        store.create_like(author.id, p.id).await.unwrap();

        let deletion = store.delete_post(p.id).await.unwrap().unwrap();
        assert_eq!(deletion.deleted_comments, 1);
        assert_eq!(deletion.deleted_likes, 1);
        assert_eq!(deletion.deleted_media.len(), 1);

        assert!(store.find_post(p.id).await.unwrap().is_none());
        assert!(store.comments_for_post(p.id).await.unwrap().is_empty());
        assert!(store
            .liked_post_ids(author.id, &[p.id])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_users_is_case_insensitive_and_paginated() {
        let store = MemoryStore::new();
        user(&store, "Alice").await;
        user(&store, "Alina").await;
        user(&store, "Bob").await;

        let page = store
            .search_users(&UserSearch {
                term: Some("ali".to_string()),
                page: 1,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].first_name, "Alina");
    }

    #[tokio::test]
    async fn test_anonymize_user() {
        let store = MemoryStore::new();
        let u = user(&store, "ada").await;
        let anon = store.anonymize_user(u.id).await.unwrap().unwrap();
        assert_eq!(anon.first_name, "Anonymous");
        assert_eq!(anon.last_name, "");
        assert!(!anon.is_active);
        assert_eq!(anon.email, Some(anonymized_email(u.id)));
    }
}
