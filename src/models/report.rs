//! Content report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A report filed against a post.
///
/// `post_id` becomes `None` once the reported post has been removed; the
/// report itself is kept for the moderation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentReport {
    pub id: i64,
    /// `None` for anonymous reports
    pub reporter_id: Option<i64>,
    pub post_id: Option<i64>,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Moderation state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
    Approved,
    Dismissed,
}

impl ReportStatus {
    /// Whether moving a report to this status takes the reported post down
    pub fn removes_post(&self) -> bool {
        matches!(self, ReportStatus::Approved | ReportStatus::Resolved)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Pending => write!(f, "pending"),
            ReportStatus::Reviewed => write!(f, "reviewed"),
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Approved => write!(f, "approved"),
            ReportStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "resolved" => Ok(ReportStatus::Resolved),
            "approved" => Ok(ReportStatus::Approved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(anyhow::anyhow!("Invalid report status: {}", s)),
        }
    }
}

/// Input for filing a report
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub post_id: i64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Dashboard numbers for administrators
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_books: i64,
    pub total_reports: i64,
    pub pending_reports: i64,
    pub active_users: i64,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}
