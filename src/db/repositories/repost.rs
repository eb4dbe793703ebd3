//! Repost repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::Repost;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Repost repository trait
#[async_trait]
pub trait RepostRepository: Send + Sync {
    /// Store a repost and bump the post counter.
    ///
    /// Returns `None` when the user already reposted this post.
    async fn create(&self, user_id: i64, post_id: i64, comment: Option<&str>) -> Result<Option<Repost>>;

    /// Remove a repost; returns `false` when there was none
    async fn delete(&self, user_id: i64, post_id: i64) -> Result<bool>;

    /// Reposts made by a user, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Repost>>;
}

#[derive(sqlx::FromRow)]
struct RepostRecord {
    id: i64,
    user_id: i64,
    post_id: i64,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RepostRecord> for Repost {
    fn from(r: RepostRecord) -> Self {
        Repost {
            id: r.id,
            user_id: r.user_id,
            post_id: r.post_id,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// SQLx-based repost repository implementation
pub struct SqlxRepostRepository {
    pool: DynDatabasePool,
}

impl SqlxRepostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RepostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RepostRepository for SqlxRepostRepository {
    async fn create(&self, user_id: i64, post_id: i64, comment: Option<&str>) -> Result<Option<Repost>> {
        let insert = format!(
            "{} INTO reposts (user_id, post_id, comment, created_at) VALUES (?, ?, ?, ?)",
            self.pool.driver().insert_ignore()
        );
        let now = Utc::now();

        let id = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let result = sqlx::query(&insert)
                .bind(user_id)
                .bind(post_id)
                .bind(comment)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to insert repost")?;

            let id = if result.rows_affected() == 1 {
                sqlx::query("UPDATE posts SET reposts_count = reposts_count + 1 WHERE id = ?")
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to increment reposts count")?;
                Some(result.insert_id())
            } else {
                None
            };
            tx.commit().await.context("Failed to commit repost")?;
            id
        });

        Ok(id.map(|id| Repost {
            id,
            user_id,
            post_id,
            comment: comment.map(str::to_string),
            created_at: now,
        }))
    }

    async fn delete(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let decrement = format!(
            "UPDATE posts SET reposts_count = {}(reposts_count - 1, 0) WHERE id = ?",
            self.pool.driver().greatest()
        );

        let removed = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let removed = sqlx::query("DELETE FROM reposts WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete repost")?
                .rows_affected()
                > 0;

            if removed {
                sqlx::query(&decrement)
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to decrement reposts count")?;
            }
            tx.commit().await.context("Failed to commit repost removal")?;
            removed
        });

        Ok(removed)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Repost>> {
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, RepostRecord>(
                "SELECT id, user_id, post_id, comment, created_at FROM reposts \
                 WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await
        })
        .context("Failed to list reposts")?;
        Ok(records.into_iter().map(Repost::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostType, User};

    #[tokio::test]
    async fn test_repost_once_per_user() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("r".into(), "r@example.com".into(), "h".into(), "R".into(), false))
            .await
            .unwrap();
        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts
            .create(&Post::new(user.id, PostType::Post, "share me".into()))
            .await
            .unwrap();
        let repo = SqlxRepostRepository::new(pool);

        let first = repo.create(user.id, post.id, Some("nice")).await.unwrap();
        assert!(first.is_some());
        assert!(repo.create(user.id, post.id, None).await.unwrap().is_none());
        assert_eq!(posts.get_by_id(post.id).await.unwrap().unwrap().reposts_count, 1);

        let listed = repo.list_by_user(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].comment.as_deref(), Some("nice"));

        assert!(repo.delete(user.id, post.id).await.unwrap());
        assert!(!repo.delete(user.id, post.id).await.unwrap());
        assert_eq!(posts.get_by_id(post.id).await.unwrap().unwrap().reposts_count, 0);
    }
}
