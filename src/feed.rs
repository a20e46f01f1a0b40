/*!
 * Feed composition
 * A viewer's timeline: posts by the viewer and everyone they follow, newest
 * first, topped up with the newest posts from everyone else when a page
 * comes up short.
 */
use uuid::Uuid;

use crate::{
    db::models::Post,
    store::{page_offset, total_pages, Store, StoreResult},
};

#[derive(Debug, Clone, Copy)]
pub struct FeedRequest {
    pub viewer: Uuid,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
}

pub async fn compose_feed(store: &dyn Store, req: FeedRequest) -> StoreResult<FeedPage> {
    let mut authors = store.followed_ids(req.viewer).await?;
    authors.push(req.viewer);

    let offset = page_offset(req.page, req.limit);
    let mut posts = store.posts_by_authors(&authors, offset, req.limit).await?;

    let shortfall = req.limit - posts.len() as i64;
    if shortfall > 0 {
        let backfill = store.latest_posts_excluding(&authors, shortfall).await?;
        posts.extend(backfill);
    }

    annotate_likes(store, req.viewer, &mut posts).await?;

    let total = store.count_posts_by_authors(&authors).await?;
    let total_pages = total_pages(total, req.limit);

    tracing::debug!(
        viewer = %req.viewer,
        page = req.page,
        returned = posts.len(),
        total_pages,
        "Composed feed"
    );

    Ok(FeedPage {
        posts,
        current_page: req.page,
        total_pages,
        has_next_page: req.page < total_pages,
    })
}

/// Mark each post with whether `viewer` has liked it.
pub async fn annotate_likes(store: &dyn Store, viewer: Uuid, posts: &mut [Post]) -> StoreResult<()> {
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let liked = store.liked_post_ids(viewer, &ids).await?;
    for post in posts.iter_mut() {
        post.liked_by_user = Some(liked.contains(&post.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::{NewPost, NewUser, User, ROLE_USER},
        store::MemoryStore,
    };

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                github_id: name.to_string(),
                first_name: name.to_string(),
                last_name: String::new(),
                email: None,
                profile_picture: None,
                bio: None,
                role: ROLE_USER.to_string(),
                is_guest: false,
            })
            .await
            .unwrap()
    }

    async fn post(store: &MemoryStore, author: &User, content: &str) -> Post {
        store
            .create_post(NewPost {
                author: author.id,
                content: content.to_string(),
                media: None,
            })
            .await
            .unwrap()
    }

    fn contents(page: &FeedPage) -> Vec<&str> {
        page.posts.iter().map(|p| p.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_feed_backfills_from_strangers() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let friend = user(&store, "friend").await;
        let stranger = user(&store, "stranger").await;
        store.create_follow(me.id, friend.id).await.unwrap();

        post(&store, &stranger, "s1").await;
        post(&store, &friend, "f1").await;
        post(&store, &stranger, "s2").await;
        post(&store, &me, "m1").await;

        let page = compose_feed(
            &store,
            FeedRequest {
                viewer: me.id,
                page: 1,
                limit: 4,
            },
        )
        .await
        .unwrap();

        assert_eq!(contents(&page), vec!["m1", "f1", "s2", "s1"]);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
    }

    #[tokio::test]
    async fn test_feed_paginates_followed_posts() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let friend = user(&store, "friend").await;
        let stranger = user(&store, "stranger").await;
        store.create_follow(me.id, friend.id).await.unwrap();

        for i in 0..5 {
            post(&store, &friend, &format!("f{i}")).await;
        }
        post(&store, &stranger, "s0").await;

        let first = compose_feed(
            &store,
            FeedRequest {
                viewer: me.id,
                page: 1,
                limit: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(contents(&first), vec!["f4", "f3"]);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next_page);

        let last = compose_feed(
            &store,
            FeedRequest {
                viewer: me.id,
                page: 3,
                limit: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(contents(&last), vec!["f0", "s0"]);
        assert!(!last.has_next_page);
        assert!(last.posts.len() <= 2);
    }

    #[tokio::test]
    async fn test_feed_marks_liked_posts() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let liked = post(&store, &me, "liked").await;
        post(&store, &me, "plain").await;
        store.create_like(me.id, liked.id).await.unwrap();

        let page = compose_feed(
            &store,
            FeedRequest {
                viewer: me.id,
                page: 1,
                limit: 10,
            },
        )
        .await
        .unwrap();

        let flags: Vec<_> = page
            .posts
            .iter()
            .map(|p| (p.content.as_str(), p.liked_by_user))
            .collect();
        assert_eq!(flags, vec![("plain", Some(false)), ("liked", Some(true))]);
    }

    #[tokio::test]
    async fn test_empty_feed_is_not_an_error() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let page = compose_feed(
            &store,
            FeedRequest {
                viewer: me.id,
                page: 1,
                limit: 10,
            },
        )
        .await
        .unwrap();
        assert!(page.posts.is_empty());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }
}
