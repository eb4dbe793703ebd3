//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{NotificationPreferences, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Column list shared by every user query
pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, bio, \
     avatar, currently_reading, favorite_quote, is_admin, points, followers_count, \
     following_count, notification_preferences, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist profile fields (display name, bio, avatar, reading, quote)
    async fn update_profile(&self, user: &User) -> Result<User>;

    /// Replace the password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Replace notification preferences
    async fn update_preferences(&self, id: i64, prefs: &NotificationPreferences) -> Result<()>;

    /// Grant or revoke admin rights
    async fn set_admin(&self, id: i64, is_admin: bool) -> Result<()>;

    /// Add points to the running total
    async fn add_points(&self, id: i64, points: i64) -> Result<()>;

    /// Users with the most points
    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>>;

    /// All users, newest first
    async fn list(&self) -> Result<Vec<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// Row as stored; preferences are a JSON string
#[derive(sqlx::FromRow)]
pub(crate) struct UserRecord {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    display_name: String,
    bio: Option<String>,
    avatar: Option<String>,
    currently_reading: Option<String>,
    favorite_quote: Option<String>,
    is_admin: bool,
    points: i64,
    followers_count: i64,
    following_count: i64,
    notification_preferences: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        // Malformed or missing preferences fall back to the defaults
        let notification_preferences = r
            .notification_preferences
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();

        User {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            display_name: r.display_name,
            bio: r.bio,
            avatar: r.avatar,
            currently_reading: r.currently_reading,
            favorite_quote: r.favorite_quote,
            is_admin: r.is_admin,
            points: r.points,
            followers_count: r.followers_count,
            following_count: r.following_count,
            notification_preferences,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, UserRecord>(&sql)
                .bind(value)
                .fetch_optional(pool)
                .await
        })
        .with_context(|| format!("Failed to get user by {}", column))?;

        Ok(record.map(User::from))
    }

    async fn find_many(&self, sql: &str, limit: Option<i64>) -> Result<Vec<User>> {
        let records = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_as::<_, UserRecord>(sql);
            if let Some(limit) = limit {
                query = query.bind(limit);
            }
            query.fetch_all(pool).await
        })
        .context("Failed to list users")?;

        Ok(records.into_iter().map(User::from).collect())
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let prefs = serde_json::to_string(&user.notification_preferences)?;
        let result = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO users (username, email, password_hash, display_name, bio, avatar,
                    currently_reading, favorite_quote, is_admin, points, followers_count,
                    following_count, notification_preferences, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(&user.bio)
            .bind(&user.avatar)
            .bind(&user.currently_reading)
            .bind(&user.favorite_quote)
            .bind(user.is_admin)
            .bind(user.points)
            .bind(&prefs)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create user")?;

        self.get_by_id(result)
            .await?
            .context("User not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, UserRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get user by ID")?;

        Ok(record.map(User::from))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn update_profile(&self, user: &User) -> Result<User> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE users
                SET display_name = ?, bio = ?, avatar = ?, currently_reading = ?,
                    favorite_quote = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.display_name)
            .bind(&user.bio)
            .bind(&user.avatar)
            .bind(&user.currently_reading)
            .bind(&user.favorite_quote)
            .bind(Utc::now())
            .bind(user.id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .context("User not found after update")
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to update password")?;
        Ok(())
    }

    async fn update_preferences(&self, id: i64, prefs: &NotificationPreferences) -> Result<()> {
        let json = serde_json::to_string(prefs)?;
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE users SET notification_preferences = ?, updated_at = ? WHERE id = ?")
                .bind(&json)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to update notification preferences")?;
        Ok(())
    }

    async fn set_admin(&self, id: i64, is_admin: bool) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE users SET is_admin = ?, updated_at = ? WHERE id = ?")
                .bind(is_admin)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to update admin flag")?;
        Ok(())
    }

    async fn add_points(&self, id: i64, points: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
                .bind(points)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to add points")?;
        Ok(())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY points DESC, id ASC LIMIT ?",
            USER_COLUMNS
        );
        self.find_many(&sql, Some(limit)).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        );
        self.find_many(&sql, None).await
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
        })
        .context("Failed to count users")?;
        Ok(count)
    }
}
