//! Like repository
//!
//! A like row exists at most once per (user, post) and `posts.likes_count`
//! moves together with the row inside one transaction.

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Like repository trait
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert a like; returns `false` when it already existed
    async fn like(&self, user_id: i64, post_id: i64) -> Result<bool>;

    /// Remove a like; returns `false` when there was none
    async fn unlike(&self, user_id: i64, post_id: i64) -> Result<bool>;

    async fn has_liked(&self, user_id: i64, post_id: i64) -> Result<bool>;

    /// Current counter on the post
    async fn likes_count(&self, post_id: i64) -> Result<i64>;
}

/// SQLx-based like repository implementation
pub struct SqlxLikeRepository {
    pool: DynDatabasePool,
}

impl SqlxLikeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LikeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LikeRepository for SqlxLikeRepository {
    async fn like(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let insert = format!(
            "{} INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?)",
            self.pool.driver().insert_ignore()
        );

        let inserted = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let inserted = sqlx::query(&insert)
                .bind(user_id)
                .bind(post_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .context("Failed to insert like")?
                .rows_affected()
                == 1;

            if inserted {
                sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?")
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to increment likes count")?;
            }
            tx.commit().await.context("Failed to commit like")?;
            inserted
        });

        Ok(inserted)
    }

    async fn unlike(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let decrement = format!(
            "UPDATE posts SET likes_count = {}(likes_count - 1, 0) WHERE id = ?",
            self.pool.driver().greatest()
        );

        let removed = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete like")?
                .rows_affected()
                > 0;

            if removed {
                sqlx::query(&decrement)
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to decrement likes count")?;
            }
            tx.commit().await.context("Failed to commit unlike")?;
            removed
        });

        Ok(removed)
    }

    async fn has_liked(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .fetch_one(pool)
                .await
        })
        .context("Failed to check like")?;
        Ok(count > 0)
    }

    async fn likes_count(&self, post_id: i64) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT likes_count FROM posts WHERE id = ?")
                .bind(post_id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to read likes count")?;
        Ok(count.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostType, User};

    async fn setup() -> (DynDatabasePool, SqlxLikeRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "fan".into(),
                "fan@example.com".into(),
                "hash".into(),
                "Fan".into(),
                false,
            ))
            .await
            .unwrap();
        let post = SqlxPostRepository::new(pool.clone())
            .create(&Post::new(user.id, PostType::Post, "hello".into()))
            .await
            .unwrap();
        (pool.clone(), SqlxLikeRepository::new(pool), user.id, post.id)
    }

    #[tokio::test]
    async fn test_like_is_idempotent() {
        let (pool, repo, user_id, post_id) = setup().await;

        assert!(repo.like(user_id, post_id).await.unwrap());
        assert!(!repo.like(user_id, post_id).await.unwrap());
        assert_eq!(repo.likes_count(post_id).await.unwrap(), 1);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_unlike_keeps_counter_in_sync() {
        let (_pool, repo, user_id, post_id) = setup().await;

        assert!(!repo.unlike(user_id, post_id).await.unwrap());
        assert_eq!(repo.likes_count(post_id).await.unwrap(), 0);

        repo.like(user_id, post_id).await.unwrap();
        assert!(repo.has_liked(user_id, post_id).await.unwrap());
        assert!(repo.unlike(user_id, post_id).await.unwrap());
        assert!(!repo.has_liked(user_id, post_id).await.unwrap());
        assert_eq!(repo.likes_count(post_id).await.unwrap(), 0);
    }
}
