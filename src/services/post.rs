//! Post service
//!
//! Reviews, fan art, quotes and plain posts: validation, the feed, and the
//! side effects of writing (book rating aggregate, achievement sync).

use crate::db::repositories::PostRepository;
use crate::models::{
    CreatePostInput, ListParams, Post, PostType, PostWithMeta, UpdatePostInput, User,
};
use crate::services::achievement::AchievementService;
use crate::services::book::BookService;
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

fn validate_rating(post_type: PostType, rating: Option<i32>) -> ServiceResult<()> {
    match rating {
        None => Ok(()),
        Some(_) if post_type != PostType::Review => Err(ServiceError::validation(
            "Only reviews can carry a rating",
        )),
        Some(rating) if !(1..=5).contains(&rating) => Err(ServiceError::validation(
            "Rating must be between 1 and 5",
        )),
        Some(_) => Ok(()),
    }
}

/// Fan art may consist of an image alone; everything else needs text
fn validate_content(post_type: PostType, content: &str, image_url: Option<&str>) -> ServiceResult<()> {
    if !content.trim().is_empty() {
        return Ok(());
    }
    if post_type == PostType::Fanart && image_url.is_some_and(|url| !url.trim().is_empty()) {
        return Ok(());
    }
    Err(ServiceError::validation("Post content cannot be empty"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    books: Arc<BookService>,
    achievements: Arc<AchievementService>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        books: Arc<BookService>,
        achievements: Arc<AchievementService>,
    ) -> Self {
        Self {
            post_repo,
            books,
            achievements,
        }
    }

    pub async fn create(&self, author: &User, input: CreatePostInput) -> ServiceResult<PostWithMeta> {
        let post_type: PostType = input
            .post_type
            .parse()
            .map_err(|_| ServiceError::validation(format!("Invalid post type: {}", input.post_type)))?;
        validate_content(post_type, &input.content, input.image_url.as_deref())?;
        validate_rating(post_type, input.rating)?;

        let book_id = match (input.book_id, input.book) {
            (Some(book_id), _) => Some(self.books.get(book_id).await?.id),
            (None, Some(book)) => Some(self.books.create_or_resolve(book).await?.id),
            (None, None) => None,
        };

        let mut post = Post::new(author.id, post_type, input.content.trim().to_string());
        post.book_id = book_id;
        post.title = non_empty(input.title);
        post.image_url = non_empty(input.image_url);
        post.rating = input.rating;

        let post = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;
        tracing::debug!(post_id = post.id, user_id = author.id, post_type = %post.post_type, "Post created");

        if let (true, Some(book_id)) = (post.is_rated_review(), post.book_id) {
            self.books.refresh_rating(book_id).await?;
        }
        self.achievements.sync_quietly(author.id).await;

        self.get(post.id, Some(author.id)).await
    }

    /// Edit a post. Only its author may do so.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdatePostInput,
    ) -> ServiceResult<PostWithMeta> {
        let mut post = self.get_post(id).await?;
        if post.user_id != actor.id {
            return Err(ServiceError::forbidden("You can only edit your own posts"));
        }
        let previous_rating = post.rating;

        if let Some(title) = input.title {
            post.title = non_empty(Some(title));
        }
        if let Some(image_url) = input.image_url {
            post.image_url = non_empty(Some(image_url));
        }
        if let Some(content) = input.content {
            post.content = content.trim().to_string();
        }
        validate_content(post.post_type, &post.content, post.image_url.as_deref())?;
        if input.rating.is_some() {
            validate_rating(post.post_type, input.rating)?;
            post.rating = input.rating;
        }
        post.updated_at = Utc::now();

        let post = self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        if let (true, Some(book_id)) = (post.rating != previous_rating, post.book_id) {
            self.books.refresh_rating(book_id).await?;
        }

        self.get(post.id, Some(actor.id)).await
    }

    /// Delete a post with its likes, reposts and comments.
    ///
    /// Allowed for the author and for administrators.
    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let post = self.get_post(id).await?;
        if !actor.can_manage(post.user_id) {
            return Err(ServiceError::forbidden("You can only delete your own posts"));
        }
        self.remove(&post).await?;
        if actor.id != post.user_id {
            tracing::info!(post_id = id, admin_id = actor.id, "Post removed by admin");
        }
        Ok(())
    }

    /// Remove a post and repair what depended on it
    pub async fn remove(&self, post: &Post) -> ServiceResult<()> {
        self.post_repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?;

        if let (true, Some(book_id)) = (post.is_rated_review(), post.book_id) {
            self.books.refresh_rating(book_id).await?;
        }
        self.achievements.sync_quietly(post.user_id).await;
        Ok(())
    }

    /// Raw post by id
    pub async fn get_post(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", id)))
    }

    pub async fn get(&self, id: i64, viewer: Option<i64>) -> ServiceResult<PostWithMeta> {
        self.post_repo
            .get_with_meta(id, viewer)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", id)))
    }

    /// Approved posts, newest first, optionally of a single type
    pub async fn feed(
        &self,
        post_type: Option<&str>,
        params: ListParams,
        viewer: Option<i64>,
    ) -> ServiceResult<Vec<PostWithMeta>> {
        let post_type = match post_type.map(str::trim).filter(|t| !t.is_empty() && *t != "all") {
            Some(raw) => Some(
                raw.parse::<PostType>()
                    .map_err(|_| ServiceError::validation(format!("Invalid post type: {}", raw)))?,
            ),
            None => None,
        };

        let posts = self
            .post_repo
            .feed(post_type, &params, viewer)
            .await
            .context("Failed to load feed")?;
        Ok(posts)
    }

    pub async fn list_by_user(
        &self,
        user_id: i64,
        viewer: Option<i64>,
    ) -> ServiceResult<Vec<PostWithMeta>> {
        let posts = self
            .post_repo
            .list_by_user(user_id, viewer)
            .await
            .context("Failed to list user posts")?;
        Ok(posts)
    }

    /// Posts the user liked; visible to that user only
    pub async fn liked(&self, actor: &User, user_id: i64) -> ServiceResult<Vec<PostWithMeta>> {
        if actor.id != user_id {
            return Err(ServiceError::forbidden("Liked posts are private"));
        }
        let posts = self
            .post_repo
            .list_liked_by(user_id)
            .await
            .context("Failed to list liked posts")?;
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateBookInput;
    use crate::services::testing::{register, TestContext};

    fn input(post_type: &str, content: &str) -> CreatePostInput {
        CreatePostInput {
            post_type: post_type.to_string(),
            content: content.to_string(),
            title: None,
            image_url: None,
            rating: None,
            book_id: None,
            book: None,
        }
    }

    fn review(book_id: i64, rating: i32) -> CreatePostInput {
        CreatePostInput {
            rating: Some(rating),
            book_id: Some(book_id),
            ..input("review", "Loved it")
        }
    }

    async fn book(ctx: &TestContext) -> i64 {
        ctx.services
            .books
            .create_or_resolve(CreateBookInput {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_rating_rules() {
        assert!(validate_rating(PostType::Review, Some(5)).is_ok());
        assert!(validate_rating(PostType::Review, None).is_ok());
        assert!(validate_rating(PostType::Review, Some(0)).is_err());
        assert!(validate_rating(PostType::Review, Some(6)).is_err());
        assert!(validate_rating(PostType::Quote, Some(3)).is_err());
    }

    #[test]
    fn test_content_rules() {
        assert!(validate_content(PostType::Post, "hi", None).is_ok());
        assert!(validate_content(PostType::Post, "  ", None).is_err());
        assert!(validate_content(PostType::Fanart, "", Some("https://img/x.png")).is_ok());
        assert!(validate_content(PostType::Quote, "", Some("https://img/x.png")).is_err());
    }

    #[tokio::test]
    async fn test_create_grows_feed() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let posts = &ctx.services.posts;

        let before = posts.feed(None, ListParams::default(), None).await.unwrap().len();
        let created = posts.create(&author, input("post", "Hello readers")).await.unwrap();
        let feed = posts.feed(None, ListParams::default(), Some(author.id)).await.unwrap();

        assert_eq!(feed.len(), before + 1);
        assert_eq!(feed[0].post.id, created.post.id);
        assert_eq!(feed[0].author.username, "author");
        assert_eq!(feed[0].liked_by_me, Some(false));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let posts = &ctx.services.posts;

        assert!(matches!(
            posts.create(&author, input("essay", "x")).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            posts.create(&author, input("post", "")).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            posts.create(&author, review(999, 4)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inline_book_is_created() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;

        let created = ctx
            .services
            .posts
            .create(
                &author,
                CreatePostInput {
                    book: Some(CreateBookInput {
                        title: "Emma".into(),
                        author: "Jane Austen".into(),
                        ..Default::default()
                    }),
                    ..input("quote", "It is a truth...")
                },
            )
            .await
            .unwrap();
        assert_eq!(created.book.as_ref().map(|b| b.title.as_str()), Some("Emma"));
    }

    #[tokio::test]
    async fn test_review_ratings_drive_book_aggregate() {
        let ctx = TestContext::new().await;
        let a = register(&ctx, "alpha").await;
        let b = register(&ctx, "beta").await;
        let book_id = book(&ctx).await;
        let posts = &ctx.services.posts;

        let first = posts.create(&a, review(book_id, 5)).await.unwrap();
        posts.create(&b, review(book_id, 3)).await.unwrap();
        let book = ctx.services.books.get(book_id).await.unwrap();
        assert_eq!(book.ratings_count, 2);
        assert_eq!(book.average_rating, Some(4.0));

        posts
            .update(&a, first.post.id, UpdatePostInput { rating: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ctx.services.books.get(book_id).await.unwrap().average_rating, Some(2.0));

        posts.delete(&a, first.post.id).await.unwrap();
        let book = ctx.services.books.get(book_id).await.unwrap();
        assert_eq!(book.ratings_count, 1);
        assert_eq!(book.average_rating, Some(3.0));
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let other = register(&ctx, "other").await;
        let admin = ctx.admin("boss").await;
        let posts = &ctx.services.posts;

        let post = posts.create(&author, input("post", "mine")).await.unwrap();
        let id = post.post.id;

        assert!(matches!(
            posts.update(&other, id, UpdatePostInput::default()).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            posts.delete(&other, id).await,
            Err(ServiceError::PermissionDenied(_))
        ));

        let edited = posts
            .update(
                &author,
                id,
                UpdatePostInput {
                    content: Some("edited".into()),
                    title: Some("A title".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.post.content, "edited");
        assert_eq!(edited.post.title.as_deref(), Some("A title"));

        posts.delete(&admin, id).await.unwrap();
        assert!(matches!(posts.get(id, None).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_feed_type_filter() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let posts = &ctx.services.posts;
        posts.create(&author, input("post", "one")).await.unwrap();
        posts.create(&author, input("quote", "two")).await.unwrap();

        let quotes = posts.feed(Some("quote"), ListParams::default(), None).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(posts.feed(Some("all"), ListParams::default(), None).await.unwrap().len(), 2);
        assert!(matches!(
            posts.feed(Some("poem"), ListParams::default(), None).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_liked_posts_are_private() {
        let ctx = TestContext::new().await;
        let me = register(&ctx, "myself").await;
        let other = register(&ctx, "other").await;

        assert!(ctx.services.posts.liked(&me, me.id).await.unwrap().is_empty());
        assert!(matches!(
            ctx.services.posts.liked(&other, me.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
    }
}
