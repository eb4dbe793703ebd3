//! Reading log model
//!
//! A book log is a user's reading status for one book. There is at most one
//! log per (user, book).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BookSummary;

/// Reading status record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLog {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: ReadingStatus,
    /// Percentage read, 0 to 100
    pub progress: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub finish_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookLog {
    pub fn new(user_id: i64, book_id: i64, status: ReadingStatus) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            book_id,
            status,
            progress: 0,
            start_date: None,
            finish_date: None,
            rating: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status/progress/rating change.
    ///
    /// Returns `true` only the first time the log reaches `Finished`. A log
    /// with a `finish_date` does not report again after a re-read.
    pub fn apply(&mut self, change: &BookLogChange, now: DateTime<Utc>) -> bool {
        let was_finished = self.status == ReadingStatus::Finished;
        let finished_before = self.finish_date.is_some();

        if let Some(status) = change.status {
            self.status = status;
        }
        if let Some(progress) = change.progress {
            self.progress = progress.clamp(0, 100);
        }
        if let Some(rating) = change.rating {
            self.rating = Some(rating);
        }

        match self.status {
            ReadingStatus::Reading => {
                if self.start_date.is_none() {
                    self.start_date = Some(now);
                }
            }
            ReadingStatus::Finished => {
                self.progress = 100;
                if !was_finished {
                    self.finish_date = Some(now);
                }
                if self.start_date.is_none() {
                    self.start_date = Some(now);
                }
            }
            ReadingStatus::WantToRead => {}
        }

        self.updated_at = now;
        !finished_before && self.status == ReadingStatus::Finished
    }
}

/// Reading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingStatus {
    WantToRead,
    Reading,
    Finished,
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingStatus::WantToRead => write!(f, "want-to-read"),
            ReadingStatus::Reading => write!(f, "reading"),
            ReadingStatus::Finished => write!(f, "finished"),
        }
    }
}

impl FromStr for ReadingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "want-to-read" | "want_to_read" => Ok(ReadingStatus::WantToRead),
            "reading" | "currently-reading" => Ok(ReadingStatus::Reading),
            "finished" | "completed" => Ok(ReadingStatus::Finished),
            _ => Err(anyhow::anyhow!("Invalid reading status: {}", s)),
        }
    }
}

/// Book log with its book summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLogWithBook {
    #[serde(flatten)]
    pub log: BookLog,
    pub book: BookSummary,
}

/// Validated change to a reading log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookLogChange {
    pub status: Option<ReadingStatus>,
    pub progress: Option<i32>,
    pub rating: Option<i32>,
}

/// Raw input for creating or updating a log
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLogInput {
    #[serde(default)]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<i32>,
    #[serde(default)]
    pub rating: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn change(status: Option<ReadingStatus>, progress: Option<i32>) -> BookLogChange {
        BookLogChange {
            status,
            progress,
            rating: None,
        }
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!("completed".parse::<ReadingStatus>().unwrap(), ReadingStatus::Finished);
        assert_eq!(
            "currently-reading".parse::<ReadingStatus>().unwrap(),
            ReadingStatus::Reading
        );
        assert_eq!(
            "want-to-read".parse::<ReadingStatus>().unwrap(),
            ReadingStatus::WantToRead
        );
        assert!("abandoned".parse::<ReadingStatus>().is_err());
    }

    #[test]
    fn test_start_reading_sets_start_date_once() {
        let mut log = BookLog::new(1, 1, ReadingStatus::WantToRead);
        let first = Utc::now();
        log.apply(&change(Some(ReadingStatus::Reading), None), first);
        assert_eq!(log.start_date, Some(first));

        let later = first + chrono::Duration::hours(1);
        log.apply(&change(Some(ReadingStatus::Reading), Some(40)), later);
        assert_eq!(log.start_date, Some(first));
        assert_eq!(log.progress, 40);
    }

    #[test]
    fn test_finish_transition_reported_once() {
        let mut log = BookLog::new(1, 1, ReadingStatus::Reading);
        let now = Utc::now();

        assert!(log.apply(&change(Some(ReadingStatus::Finished), Some(20)), now));
        assert_eq!(log.progress, 100);
        assert_eq!(log.finish_date, Some(now));

        let later = now + chrono::Duration::days(1);
        assert!(!log.apply(&change(Some(ReadingStatus::Finished), None), later));
        assert_eq!(log.finish_date, Some(now));
    }

    #[test]
    fn test_refinish_after_rereading_not_reported() {
        let mut log = BookLog::new(1, 1, ReadingStatus::Reading);
        let first = Utc::now();
        assert!(log.apply(&change(Some(ReadingStatus::Finished), None), first));

        for day in 1..=3 {
            let at = first + chrono::Duration::days(day);
            assert!(!log.apply(&change(Some(ReadingStatus::Reading), Some(10)), at));
            assert!(log.finish_date.is_some());
            assert!(!log.apply(&change(Some(ReadingStatus::Finished), None), at));
            assert_eq!(log.finish_date, Some(at));
        }
        assert_eq!(log.progress, 100);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_value(ReadingStatus::WantToRead).unwrap();
        assert_eq!(json, "want-to-read");
    }

    proptest! {
        #[test]
        fn progress_always_within_bounds(progress in any::<i32>()) {
            let mut log = BookLog::new(1, 1, ReadingStatus::Reading);
            log.apply(&change(None, Some(progress)), Utc::now());
            prop_assert!((0..=100).contains(&log.progress));
        }
    }
}
