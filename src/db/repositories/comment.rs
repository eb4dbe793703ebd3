//! Comment repository
//!
//! Comments on posts. Creating or deleting a comment adjusts
//! `posts.comments_count` in the same transaction.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Comment, CommentWithAuthor, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment and increment the post's counter
    async fn create(&self, user_id: i64, post_id: i64, content: &str) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Delete a comment and decrement the post's counter
    async fn delete(&self, comment: &Comment) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct CommentRecord {
    id: i64,
    user_id: i64,
    post_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRecord> for Comment {
    fn from(r: CommentRecord) -> Self {
        Comment {
            id: r.id,
            user_id: r.user_id,
            post_id: r.post_id,
            content: r.content,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentAuthorRecord {
    #[sqlx(flatten)]
    comment: CommentRecord,
    author_username: String,
    author_display_name: String,
    author_avatar: Option<String>,
    author_email: String,
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, user_id: i64, post_id: i64, content: &str) -> Result<Comment> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(
                "INSERT INTO comments (user_id, post_id, content, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(post_id)
            .bind(content)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create comment")?
            .insert_id();

            sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .context("Failed to increment comments count")?;
            tx.commit().await.context("Failed to commit comment")?;
            id
        });

        Ok(Comment {
            id,
            user_id,
            post_id,
            content: content.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, CommentRecord>(
                "SELECT id, user_id, post_id, content, created_at FROM comments WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
        })
        .context("Failed to get comment by ID")?;
        Ok(record.map(Comment::from))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, CommentAuthorRecord>(
                r#"
                SELECT c.id, c.user_id, c.post_id, c.content, c.created_at,
                       u.username AS author_username, u.display_name AS author_display_name,
                       u.avatar AS author_avatar, u.email AS author_email
                FROM comments c
                JOIN users u ON u.id = c.user_id
                WHERE c.post_id = ?
                ORDER BY c.created_at ASC, c.id ASC
                "#,
            )
            .bind(post_id)
            .fetch_all(pool)
            .await
        })
        .context("Failed to list comments")?;

        Ok(records
            .into_iter()
            .map(|r| {
                let author = UserSummary::new(
                    r.comment.user_id,
                    r.author_username,
                    r.author_display_name,
                    r.author_avatar,
                    &r.author_email,
                );
                CommentWithAuthor {
                    comment: r.comment.into(),
                    author,
                }
            })
            .collect())
    }

    async fn delete(&self, comment: &Comment) -> Result<()> {
        let decrement = format!(
            "UPDATE posts SET comments_count = {}(comments_count - 1, 0) WHERE id = ?",
            self.pool.driver().greatest()
        );

        with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let removed = sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(comment.id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete comment")?
                .rows_affected();
            if removed > 0 {
                sqlx::query(&decrement)
                    .bind(comment.post_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to decrement comments count")?;
            }
            tx.commit().await.context("Failed to commit comment deletion")?;
        });
        Ok(())
    }
}
