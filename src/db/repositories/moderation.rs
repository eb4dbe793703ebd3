//! Moderation repository
//!
//! Operations that span many tables: removing a user with everything they
//! own, rebuilding denormalized counters, and platform activity queries.

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Statements removing a user's footprint, children before parents.
///
/// Every statement takes the user id as its only bind.
const USER_CASCADE: &[&str] = &[
    "DELETE FROM user_achievements WHERE user_id = ?",
    "DELETE FROM notifications WHERE user_id = ?",
    "UPDATE content_reports SET reviewed_by = NULL WHERE reviewed_by = ?",
    "DELETE FROM content_reports WHERE reporter_id = ?",
    "DELETE FROM book_logs WHERE user_id = ?",
    "DELETE FROM comments WHERE user_id = ?",
    "DELETE FROM likes WHERE user_id = ?",
    "DELETE FROM reposts WHERE user_id = ?",
    "DELETE FROM follows WHERE follower_id = ?",
    "DELETE FROM follows WHERE followed_id = ?",
    "DELETE FROM quiz_results WHERE user_id = ?",
    "DELETE FROM quiz_results WHERE quiz_id IN (SELECT id FROM quizzes WHERE created_by = ?)",
    "DELETE FROM quiz_questions WHERE quiz_id IN (SELECT id FROM quizzes WHERE created_by = ?)",
    "DELETE FROM quizzes WHERE created_by = ?",
    "DELETE FROM likes WHERE post_id IN (SELECT id FROM posts WHERE user_id = ?)",
    "DELETE FROM reposts WHERE post_id IN (SELECT id FROM posts WHERE user_id = ?)",
    "DELETE FROM comments WHERE post_id IN (SELECT id FROM posts WHERE user_id = ?)",
    "UPDATE content_reports SET post_id = NULL WHERE post_id IN (SELECT id FROM posts WHERE user_id = ?)",
    "DELETE FROM posts WHERE user_id = ?",
    "DELETE FROM users WHERE id = ?",
];

/// Counter rebuilds run after a cascade and on demand
const COUNTER_REBUILD: &[&str] = &[
    r#"UPDATE users SET
        followers_count = (SELECT COUNT(*) FROM follows f WHERE f.followed_id = users.id),
        following_count = (SELECT COUNT(*) FROM follows f WHERE f.follower_id = users.id)"#,
    r#"UPDATE posts SET
        likes_count = (SELECT COUNT(*) FROM likes l WHERE l.post_id = posts.id),
        comments_count = (SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id),
        reposts_count = (SELECT COUNT(*) FROM reposts r WHERE r.post_id = posts.id)"#,
    r#"UPDATE quizzes SET
        participant_count = (SELECT COUNT(*) FROM quiz_results qr WHERE qr.quiz_id = quizzes.id),
        average_score = COALESCE(
            (SELECT AVG(qr.score) FROM quiz_results qr WHERE qr.quiz_id = quizzes.id), 0)"#,
    r#"UPDATE books SET
        average_rating = (
            SELECT AVG(p.rating) FROM posts p
            WHERE p.book_id = books.id AND p.post_type = 'review' AND p.rating IS NOT NULL),
        ratings_count = (
            SELECT COUNT(*) FROM posts p
            WHERE p.book_id = books.id AND p.post_type = 'review' AND p.rating IS NOT NULL)"#,
];

#[async_trait]
pub trait ModerationRepository: Send + Sync {
    /// Delete a user and all content they own in one transaction, then
    /// rebuild the counters their content contributed to.
    ///
    /// Returns `false` when the user does not exist.
    async fn delete_user_cascade(&self, user_id: i64) -> Result<bool>;

    /// Recompute every denormalized counter from the underlying rows
    async fn recompute_counters(&self) -> Result<()>;

    /// Distinct users who posted or touched a book log since `since`
    async fn count_active_users(&self, since: DateTime<Utc>) -> Result<i64>;
}

pub struct SqlxModerationRepository {
    pool: DynDatabasePool,
}

impl SqlxModerationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModerationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModerationRepository for SqlxModerationRepository {
    async fn delete_user_cascade(&self, user_id: i64) -> Result<bool> {
        let deleted = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let mut removed = 0;
            for statement in USER_CASCADE {
                removed = sqlx::query(statement)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to delete user: {}", statement))?
                    .rows_affected();
            }
            for statement in COUNTER_REBUILD {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to rebuild counters")?;
            }
            tx.commit().await.context("Failed to commit user deletion")?;
            removed
        });
        Ok(deleted == 1)
    }

    async fn recompute_counters(&self) -> Result<()> {
        with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            for statement in COUNTER_REBUILD {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to rebuild counters")?;
            }
            tx.commit().await.context("Failed to commit counter rebuild")?;
        });
        Ok(())
    }

    async fn count_active_users(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM (
                    SELECT user_id FROM posts WHERE created_at >= ?
                    UNION
                    SELECT user_id FROM book_logs WHERE updated_at >= ?
                ) active
                "#,
            )
            .bind(since)
            .bind(since)
            .fetch_one(pool)
            .await
        })
        .context("Failed to count active users")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepository, FollowRepository, LikeRepository, PostRepository,
        SqlxCommentRepository, SqlxFollowRepository, SqlxLikeRepository, SqlxPostRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostType, User};

    #[tokio::test]
    async fn test_delete_user_cascades_and_fixes_counters() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::new(pool.clone());
        let posts = SqlxPostRepository::new(pool.clone());
        let follows = SqlxFollowRepository::new(pool.clone());
        let likes = SqlxLikeRepository::new(pool.clone());
        let comments = SqlxCommentRepository::new(pool.clone());
        let repo = SqlxModerationRepository::new(pool);

        let alice = users
            .create(&User::new("alice".into(), "alice@example.com".into(), "h".into(), "Alice".into(), false))
            .await
            .unwrap();
        let bob = users
            .create(&User::new("bob".into(), "bob@example.com".into(), "h".into(), "Bob".into(), false))
            .await
            .unwrap();

        let alice_post = posts
            .create(&Post::new(alice.id, PostType::Post, "hello".into()))
            .await
            .unwrap();
        let bob_post = posts
            .create(&Post::new(bob.id, PostType::Post, "hi".into()))
            .await
            .unwrap();
        follows.follow(bob.id, alice.id).await.unwrap();
        follows.follow(alice.id, bob.id).await.unwrap();
        likes.like(bob.id, alice_post.id).await.unwrap();
        likes.like(alice.id, bob_post.id).await.unwrap();
        comments.create(alice.id, bob_post.id, "nice").await.unwrap();

        assert!(repo.delete_user_cascade(alice.id).await.unwrap());
        assert!(users.get_by_id(alice.id).await.unwrap().is_none());
        assert!(posts.get_by_id(alice_post.id).await.unwrap().is_none());

        let bob = users.get_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.followers_count, 0);
        assert_eq!(bob.following_count, 0);
        let bob_post = posts.get_by_id(bob_post.id).await.unwrap().unwrap();
        assert_eq!(bob_post.likes_count, 0);
        assert_eq!(bob_post.comments_count, 0);

        assert!(!repo.delete_user_cascade(alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_active_users_counts_posters_once() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::new(pool.clone());
        let posts = SqlxPostRepository::new(pool.clone());
        let repo = SqlxModerationRepository::new(pool);

        let user = users
            .create(&User::new("c".into(), "c@example.com".into(), "h".into(), "C".into(), false))
            .await
            .unwrap();
        for content in ["one", "two"] {
            posts
                .create(&Post::new(user.id, PostType::Post, content.into()))
                .await
                .unwrap();
        }

        let since = Utc::now() - chrono::Duration::days(30);
        assert_eq!(repo.count_active_users(since).await.unwrap(), 1);
        let future = Utc::now() + chrono::Duration::days(1);
        assert_eq!(repo.count_active_users(future).await.unwrap(), 0);

        repo.recompute_counters().await.unwrap();
    }
}
