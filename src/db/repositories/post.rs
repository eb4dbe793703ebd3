//! Post repository
//!
//! Database operations for posts. Read queries return posts enriched with the
//! author summary, the book summary and, when a viewer is given, whether the
//! viewer liked the post.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{BookSummary, ListParams, Post, PostType, PostWithMeta, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Statements removing one post and everything hanging off it, each bound to
/// the post id. Reports are detached so the moderation history survives.
const POST_CASCADE: &[&str] = &[
    "DELETE FROM likes WHERE post_id = ?",
    "DELETE FROM reposts WHERE post_id = ?",
    "DELETE FROM comments WHERE post_id = ?",
    "UPDATE content_reports SET post_id = NULL WHERE post_id = ?",
    "DELETE FROM posts WHERE id = ?",
];

const POST_COLUMNS: &str = "id, user_id, book_id, post_type, title, content, image_url, rating, \
     likes_count, comments_count, reposts_count, is_approved, created_at, updated_at";

/// Enriched select; the single bind is the viewer id (0 for anonymous)
const POST_META_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.book_id, p.post_type, p.title, p.content, p.image_url,
           p.rating, p.likes_count, p.comments_count, p.reposts_count, p.is_approved,
           p.created_at, p.updated_at,
           u.username AS author_username, u.display_name AS author_display_name,
           u.avatar AS author_avatar, u.email AS author_email,
           b.title AS book_title, b.author AS book_author, b.cover_url AS book_cover_url,
           CASE WHEN EXISTS (
               SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?
           ) THEN 1 ELSE 0 END AS liked
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN books b ON b.id = p.book_id
"#;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get an enriched post by ID
    async fn get_with_meta(&self, id: i64, viewer: Option<i64>) -> Result<Option<PostWithMeta>>;

    /// Approved posts, newest first, optionally filtered by type
    async fn feed(
        &self,
        post_type: Option<PostType>,
        params: &ListParams,
        viewer: Option<i64>,
    ) -> Result<Vec<PostWithMeta>>;

    /// Posts written by a user, newest first
    async fn list_by_user(&self, user_id: i64, viewer: Option<i64>) -> Result<Vec<PostWithMeta>>;

    /// Posts a user liked, most recent like first
    async fn list_liked_by(&self, user_id: i64) -> Result<Vec<PostWithMeta>>;

    /// Update editable fields (title, content, image, rating)
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post with its likes, reposts and comments in one transaction
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count posts, optionally restricted to one author and one type
    async fn count(&self, user_id: Option<i64>, post_type: Option<PostType>) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct PostRecord {
    id: i64,
    user_id: i64,
    book_id: Option<i64>,
    post_type: String,
    title: Option<String>,
    content: String,
    image_url: Option<String>,
    rating: Option<i32>,
    likes_count: i64,
    comments_count: i64,
    reposts_count: i64,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRecord> for Post {
    type Error = anyhow::Error;

    fn try_from(r: PostRecord) -> Result<Self> {
        Ok(Post {
            id: r.id,
            user_id: r.user_id,
            book_id: r.book_id,
            post_type: r.post_type.parse()?,
            title: r.title,
            content: r.content,
            image_url: r.image_url,
            rating: r.rating,
            likes_count: r.likes_count,
            comments_count: r.comments_count,
            reposts_count: r.reposts_count,
            is_approved: r.is_approved,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PostMetaRecord {
    #[sqlx(flatten)]
    post: PostRecord,
    author_username: String,
    author_display_name: String,
    author_avatar: Option<String>,
    author_email: String,
    book_title: Option<String>,
    book_author: Option<String>,
    book_cover_url: Option<String>,
    liked: i64,
}

impl PostMetaRecord {
    fn into_meta(self, with_viewer: bool) -> Result<PostWithMeta> {
        let post = Post::try_from(self.post)?;
        let author = UserSummary::new(
            post.user_id,
            self.author_username,
            self.author_display_name,
            self.author_avatar,
            &self.author_email,
        );
        let book = match (post.book_id, self.book_title, self.book_author) {
            (Some(id), Some(title), Some(author)) => Some(BookSummary {
                id,
                title,
                author,
                cover_url: self.book_cover_url,
            }),
            _ => None,
        };

        Ok(PostWithMeta {
            post,
            author,
            book,
            liked_by_me: with_viewer.then_some(self.liked != 0),
        })
    }
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_meta(
        &self,
        sql: &str,
        viewer: Option<i64>,
        binds: &[i64],
    ) -> Result<Vec<PostWithMeta>> {
        let records = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_as::<_, PostMetaRecord>(sql).bind(viewer.unwrap_or(0));
            for value in binds {
                query = query.bind(*value);
            }
            query.fetch_all(pool).await
        })
        .context("Failed to load posts")?;

        records
            .into_iter()
            .map(|r| r.into_meta(viewer.is_some()))
            .collect()
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO posts (user_id, book_id, post_type, title, content, image_url,
                    rating, likes_count, comments_count, reposts_count, is_approved,
                    created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
                "#,
            )
            .bind(post.user_id)
            .bind(post.book_id)
            .bind(post.post_type.to_string())
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image_url)
            .bind(post.rating)
            .bind(post.is_approved)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create post")?;

        self.get_by_id(id)
            .await?
            .context("Post not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, PostRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get post by ID")?;

        record.map(Post::try_from).transpose()
    }

    async fn get_with_meta(&self, id: i64, viewer: Option<i64>) -> Result<Option<PostWithMeta>> {
        let sql = format!("{} WHERE p.id = ?", POST_META_SELECT);
        let mut posts = self.fetch_meta(&sql, viewer, &[id]).await?;
        Ok(posts.pop())
    }

    async fn feed(
        &self,
        post_type: Option<PostType>,
        params: &ListParams,
        viewer: Option<i64>,
    ) -> Result<Vec<PostWithMeta>> {
        let type_filter = if post_type.is_some() {
            " AND p.post_type = ?"
        } else {
            ""
        };
        let sql = format!(
            "{} WHERE p.is_approved = ?{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_META_SELECT, type_filter
        );
        let type_name = post_type.map(|t| t.to_string());

        let records = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_as::<_, PostMetaRecord>(&sql)
                .bind(viewer.unwrap_or(0))
                .bind(true);
            if let Some(type_name) = &type_name {
                query = query.bind(type_name);
            }
            query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
        })
        .context("Failed to load feed")?;

        records
            .into_iter()
            .map(|r| r.into_meta(viewer.is_some()))
            .collect()
    }

    async fn list_by_user(&self, user_id: i64, viewer: Option<i64>) -> Result<Vec<PostWithMeta>> {
        let sql = format!(
            "{} WHERE p.user_id = ? ORDER BY p.created_at DESC, p.id DESC",
            POST_META_SELECT
        );
        self.fetch_meta(&sql, viewer, &[user_id]).await
    }

    async fn list_liked_by(&self, user_id: i64) -> Result<Vec<PostWithMeta>> {
        let sql = format!(
            "{} JOIN likes mine ON mine.post_id = p.id AND mine.user_id = ? \
             ORDER BY mine.created_at DESC, mine.id DESC",
            POST_META_SELECT
        );
        self.fetch_meta(&sql, Some(user_id), &[user_id]).await
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, content = ?, image_url = ?, rating = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image_url)
            .bind(post.rating)
            .bind(Utc::now())
            .bind(post.id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .context("Failed to update post")?;

        self.get_by_id(post.id)
            .await?
            .context("Post not found after update")
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            for statement in POST_CASCADE {
                sqlx::query(statement)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to delete post: {}", statement))?;
            }
            tx.commit().await.context("Failed to commit post deletion")?;
        });
        Ok(())
    }

    async fn count(&self, user_id: Option<i64>, post_type: Option<PostType>) -> Result<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM posts WHERE 1 = 1");
        if user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if post_type.is_some() {
            sql.push_str(" AND post_type = ?");
        }
        let type_name = post_type.map(|t| t.to_string());

        let count = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            if let Some(user_id) = user_id {
                query = query.bind(user_id);
            }
            if let Some(type_name) = &type_name {
                query = query.bind(type_name);
            }
            query.fetch_one(pool).await
        })
        .context("Failed to count posts")?;
        Ok(count)
    }
}
