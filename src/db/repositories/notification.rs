//! Notification repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{NewNotification, Notification};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// A user's notifications, newest first
    async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>>;

    /// Mark one notification read; `false` when it does not belong to the user
    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool>;

    /// Mark every unread notification read, returning how many changed
    async fn mark_all_read(&self, user_id: i64) -> Result<u64>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct NotificationRecord {
    id: i64,
    user_id: i64,
    kind: String,
    title: String,
    message: String,
    data: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = anyhow::Error;

    fn try_from(r: NotificationRecord) -> Result<Self> {
        Ok(Notification {
            id: r.id,
            user_id: r.user_id,
            kind: r.kind.parse()?,
            title: r.title,
            message: r.message,
            data: r.data.as_deref().and_then(|d| serde_json::from_str(d).ok()),
            is_read: r.is_read,
            created_at: r.created_at,
        })
    }
}

/// SQLx-based notification repository implementation
pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        let data = notification
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now();

        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO notifications (user_id, kind, title, message, data, is_read, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(notification.user_id)
            .bind(notification.kind.to_string())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&data)
            .bind(false)
            .bind(now)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create notification")?;

        Ok(Notification {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            data: notification.data.clone(),
            is_read: false,
            created_at: now,
        })
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>> {
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, NotificationRecord>(
                "SELECT id, user_id, kind, title, message, data, is_read, created_at \
                 FROM notifications WHERE user_id = ? \
                 ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
        })
        .context("Failed to list notifications")?;
        records.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let matched = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM notifications WHERE id = ? AND user_id = ?",
            )
            .bind(id)
            .bind(user_id)
            .fetch_one(pool)
            .await
        })
        .context("Failed to look up notification")?;
        if matched == 0 {
            return Ok(false);
        }

        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE notifications SET is_read = ? WHERE id = ? AND user_id = ?")
                .bind(true)
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to mark notification read")?;
        Ok(true)
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let updated = with_pool!(self.pool, pool => {
            sqlx::query("UPDATE notifications SET is_read = ? WHERE user_id = ? AND is_read = ?")
                .bind(true)
                .bind(user_id)
                .bind(false)
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
        })
        .context("Failed to mark notifications read")?;
        Ok(updated)
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = ?",
            )
            .bind(user_id)
            .bind(false)
            .fetch_one(pool)
            .await
        })
        .context("Failed to count unread notifications")?;
        Ok(count)
    }
}
