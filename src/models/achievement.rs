//! Achievement model
//!
//! Achievements are static thresholds over a handful of per-user counters.
//! A user's progress toward each one lives in `UserAchievement`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gamification milestone with a point reward
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Grouping shown in the UI (bookworm, critic, social, ...)
    pub category: String,
    pub icon: String,
    /// Points credited on unlock
    pub points: i64,
    pub requirement_type: RequirementKind,
    pub requirement_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Counter an achievement threshold is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    BooksRead,
    ReviewsWritten,
    Followers,
    Following,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::BooksRead => write!(f, "books_read"),
            RequirementKind::ReviewsWritten => write!(f, "reviews_written"),
            RequirementKind::Followers => write!(f, "followers"),
            RequirementKind::Following => write!(f, "following"),
        }
    }
}

impl FromStr for RequirementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "books_read" => Ok(RequirementKind::BooksRead),
            "reviews_written" => Ok(RequirementKind::ReviewsWritten),
            "followers" => Ok(RequirementKind::Followers),
            "following" => Ok(RequirementKind::Following),
            _ => Err(anyhow::anyhow!("Invalid requirement type: {}", s)),
        }
    }
}

/// A user's progress row for one achievement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: i64,
    pub user_id: i64,
    pub achievement_id: i64,
    pub progress: i64,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Achievement joined with one user's progress toward it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub progress: i64,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Counters recomputed from the underlying tables on every sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AchievementCounters {
    pub books_read: i64,
    pub reviews_written: i64,
    pub followers: i64,
    pub following: i64,
}

impl AchievementCounters {
    pub fn get(&self, kind: RequirementKind) -> i64 {
        match kind {
            RequirementKind::BooksRead => self.books_read,
            RequirementKind::ReviewsWritten => self.reviews_written,
            RequirementKind::Followers => self.followers,
            RequirementKind::Following => self.following,
        }
    }
}

/// Input for creating an achievement
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievementInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub points: i64,
    pub requirement_type: String,
    pub requirement_count: i64,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_icon() -> String {
    "🏆".to_string()
}
