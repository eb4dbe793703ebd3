//! Notification service
//!
//! Creates in-app notifications for social events, honoring the recipient's
//! preferences, and serves the notification inbox.

use crate::db::repositories::{NotificationRepository, UserRepository};
use crate::models::{Achievement, NewNotification, Notification, NotificationKind, Post, User};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

/// Inbox size returned by [`NotificationService::list`]
pub const INBOX_LIMIT: i64 = 50;

pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<dyn NotificationRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
        }
    }

    /// Store a notification unless the recipient opted out of its kind.
    ///
    /// Returns `None` when nothing was stored.
    pub async fn notify(&self, notification: NewNotification) -> ServiceResult<Option<Notification>> {
        let recipient = match self
            .user_repo
            .get_by_id(notification.user_id)
            .await
            .context("Failed to load notification recipient")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        let prefs = recipient.notification_preferences;
        let wanted = match notification.kind {
            NotificationKind::Like => prefs.likes_on_posts,
            NotificationKind::Follow => prefs.new_followers,
            NotificationKind::Comment => prefs.comments,
            NotificationKind::Repost => prefs.reposts,
            NotificationKind::Achievement => true,
        };
        if !wanted {
            tracing::debug!(
                user_id = recipient.id,
                kind = %notification.kind,
                "Notification suppressed by preferences"
            );
            return Ok(None);
        }

        let created = self
            .notification_repo
            .create(&notification)
            .await
            .context("Failed to store notification")?;
        Ok(Some(created))
    }

    /// Like [`notify`](Self::notify) but never fails the caller's action
    async fn deliver(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        let kind = notification.kind;
        if let Err(e) = self.notify(notification).await {
            tracing::warn!(user_id, kind = %kind, error = %e, "Failed to deliver notification");
        }
    }

    /// Someone liked a post; self-likes are silent
    pub async fn post_liked(&self, actor: &User, post: &Post) {
        if actor.id == post.user_id {
            return;
        }
        self.deliver(NewNotification {
            user_id: post.user_id,
            kind: NotificationKind::Like,
            title: "New like".to_string(),
            message: format!("{} liked your post", actor.display_name),
            data: Some(json!({ "postId": post.id, "userId": actor.id })),
        })
        .await;
    }

    pub async fn post_commented(&self, actor: &User, post: &Post, comment_id: i64) {
        if actor.id == post.user_id {
            return;
        }
        self.deliver(NewNotification {
            user_id: post.user_id,
            kind: NotificationKind::Comment,
            title: "New comment".to_string(),
            message: format!("{} commented on your post", actor.display_name),
            data: Some(json!({ "postId": post.id, "commentId": comment_id, "userId": actor.id })),
        })
        .await;
    }

    pub async fn post_reposted(&self, actor: &User, post: &Post) {
        if actor.id == post.user_id {
            return;
        }
        self.deliver(NewNotification {
            user_id: post.user_id,
            kind: NotificationKind::Repost,
            title: "New repost".to_string(),
            message: format!("{} reposted your post", actor.display_name),
            data: Some(json!({ "postId": post.id, "userId": actor.id })),
        })
        .await;
    }

    pub async fn followed(&self, actor: &User, followed_id: i64) {
        if actor.id == followed_id {
            return;
        }
        self.deliver(NewNotification {
            user_id: followed_id,
            kind: NotificationKind::Follow,
            title: "New follower".to_string(),
            message: format!("{} started following you", actor.display_name),
            data: Some(json!({ "userId": actor.id })),
        })
        .await;
    }

    pub async fn achievement_unlocked(&self, user_id: i64, achievement: &Achievement) {
        self.deliver(NewNotification {
            user_id,
            kind: NotificationKind::Achievement,
            title: "Achievement Unlocked!".to_string(),
            message: format!(
                "You earned \"{}\" and {} points!",
                achievement.name, achievement.points
            ),
            data: Some(json!({ "achievementId": achievement.id })),
        })
        .await;
    }

    /// Newest notifications first
    pub async fn list(&self, user_id: i64) -> ServiceResult<Vec<Notification>> {
        let notifications = self
            .notification_repo
            .list_for_user(user_id, INBOX_LIMIT)
            .await
            .context("Failed to list notifications")?;
        Ok(notifications)
    }

    /// Mark one of the user's notifications read.
    ///
    /// Someone else's notification is reported as missing.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> ServiceResult<()> {
        let updated = self
            .notification_repo
            .mark_read(id, user_id)
            .await
            .context("Failed to mark notification read")?;
        if !updated {
            return Err(ServiceError::not_found(format!("Notification {}", id)));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> ServiceResult<u64> {
        let updated = self
            .notification_repo
            .mark_all_read(user_id)
            .await
            .context("Failed to mark notifications read")?;
        Ok(updated)
    }

    pub async fn unread_count(&self, user_id: i64) -> ServiceResult<i64> {
        let count = self
            .notification_repo
            .unread_count(user_id)
            .await
            .context("Failed to count unread notifications")?;
        Ok(count)
    }
}
