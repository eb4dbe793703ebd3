//! Social graph models: follows, likes and reposts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PostWithMeta;

/// A directed follow edge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A like on a post; at most one per (user, post)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A share of another user's post, with an optional comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repost {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A repost together with the post it shares
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepostWithPost {
    #[serde(flatten)]
    pub repost: Repost,
    pub post: PostWithMeta,
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}
