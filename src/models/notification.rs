//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// In-app notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Event-specific payload (post id, actor id, achievement id)
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Follow,
    Comment,
    Repost,
    Achievement,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Like => write!(f, "like"),
            NotificationKind::Follow => write!(f, "follow"),
            NotificationKind::Comment => write!(f, "comment"),
            NotificationKind::Repost => write!(f, "repost"),
            NotificationKind::Achievement => write!(f, "achievement"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "follow" => Ok(NotificationKind::Follow),
            "comment" => Ok(NotificationKind::Comment),
            "repost" => Ok(NotificationKind::Repost),
            "achievement" => Ok(NotificationKind::Achievement),
            _ => Err(anyhow::anyhow!("Invalid notification type: {}", s)),
        }
    }
}

/// Notification to be stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
