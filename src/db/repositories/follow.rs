//! Follow repository
//!
//! Follow edges and the denormalized follower/following counters on users.
//! Counters only move when an edge row is actually inserted or deleted.

use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::user::UserRecord;

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Add an edge; returns `false` when it already existed
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Remove an edge; returns `false` when there was none
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Users following `user_id`, most recent first
    async fn followers(&self, user_id: i64) -> Result<Vec<User>>;

    /// Users `user_id` follows, most recent first
    async fn following(&self, user_id: i64) -> Result<Vec<User>>;

    /// Number of follow rows pointing at `user_id`
    async fn count_followers(&self, user_id: i64) -> Result<i64>;

    /// Number of follow rows starting from `user_id`
    async fn count_following(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }

    async fn list_users(&self, join_column: &str, filter_column: &str, user_id: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT u.id, u.username, u.email, u.password_hash, u.display_name, u.bio, u.avatar, \
                    u.currently_reading, u.favorite_quote, u.is_admin, u.points, \
                    u.followers_count, u.following_count, u.notification_preferences, \
                    u.created_at, u.updated_at \
             FROM follows f JOIN users u ON u.id = f.{} \
             WHERE f.{} = ? ORDER BY f.created_at DESC, f.id DESC",
            join_column, filter_column
        );
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, UserRecord>(&sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
        })
        .context("Failed to list follow edges")?;
        Ok(records.into_iter().map(User::from).collect())
    }

    async fn count_where(&self, column: &str, user_id: i64) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM follows WHERE {} = ?", column);
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(user_id)
                .fetch_one(pool)
                .await
        })
        .context("Failed to count follows")?;
        Ok(count)
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let insert = format!(
            "{} INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
            self.pool.driver().insert_ignore()
        );

        let inserted = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let inserted = sqlx::query(&insert)
                .bind(follower_id)
                .bind(followed_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .context("Failed to insert follow")?
                .rows_affected()
                == 1;

            if inserted {
                sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = ?")
                    .bind(follower_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update following count")?;
                sqlx::query("UPDATE users SET followers_count = followers_count + 1 WHERE id = ?")
                    .bind(followed_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update followers count")?;
            }
            tx.commit().await.context("Failed to commit follow")?;
            inserted
        });

        Ok(inserted)
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let greatest = self.pool.driver().greatest();
        let dec_following = format!(
            "UPDATE users SET following_count = {}(following_count - 1, 0) WHERE id = ?",
            greatest
        );
        let dec_followers = format!(
            "UPDATE users SET followers_count = {}(followers_count - 1, 0) WHERE id = ?",
            greatest
        );

        let removed = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
                .bind(follower_id)
                .bind(followed_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete follow")?
                .rows_affected()
                > 0;

            if removed {
                sqlx::query(&dec_following)
                    .bind(follower_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update following count")?;
                sqlx::query(&dec_followers)
                    .bind(followed_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update followers count")?;
            }
            tx.commit().await.context("Failed to commit unfollow")?;
            removed
        });

        Ok(removed)
    }

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followed_id = ?",
            )
            .bind(follower_id)
            .bind(followed_id)
            .fetch_one(pool)
            .await
        })
        .context("Failed to check follow")?;
        Ok(count > 0)
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>> {
        self.list_users("follower_id", "followed_id", user_id).await
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>> {
        self.list_users("followed_id", "follower_id", user_id).await
    }

    async fn count_followers(&self, user_id: i64) -> Result<i64> {
        self.count_where("followed_id", user_id).await
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        self.count_where("follower_id", user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxFollowRepository, SqlxUserRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let user = users
                .create(&User::new(
                    name.into(),
                    format!("{}@example.com", name),
                    "hash".into(),
                    name.into(),
                    false,
                ))
                .await
                .unwrap();
            ids.push(user.id);
        }
        (SqlxFollowRepository::new(pool), users, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_follow_twice_counts_once() {
        let (repo, users, alice, bob) = setup().await;

        assert!(repo.follow(alice, bob).await.unwrap());
        assert!(!repo.follow(alice, bob).await.unwrap());

        let bob_row = users.get_by_id(bob).await.unwrap().unwrap();
        let alice_row = users.get_by_id(alice).await.unwrap().unwrap();
        assert_eq!(bob_row.followers_count, 1);
        assert_eq!(alice_row.following_count, 1);
        assert_eq!(repo.count_followers(bob).await.unwrap(), 1);
        assert!(repo.is_following(alice, bob).await.unwrap());
        assert!(!repo.is_following(bob, alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow_never_goes_negative() {
        let (repo, users, alice, bob) = setup().await;

        assert!(!repo.unfollow(alice, bob).await.unwrap());
        repo.follow(alice, bob).await.unwrap();
        assert!(repo.unfollow(alice, bob).await.unwrap());
        assert!(!repo.unfollow(alice, bob).await.unwrap());

        let bob_row = users.get_by_id(bob).await.unwrap().unwrap();
        assert_eq!(bob_row.followers_count, 0);
        assert_eq!(repo.count_following(alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follower_lists() {
        let (repo, _users, alice, bob) = setup().await;
        repo.follow(alice, bob).await.unwrap();

        let followers = repo.followers(bob).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "alice");

        let following = repo.following(alice).await.unwrap();
        assert_eq!(following[0].username, "bob");
        assert!(repo.followers(alice).await.unwrap().is_empty());
    }
}
