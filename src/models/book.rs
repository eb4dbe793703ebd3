//! Book model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Book entity, either added by a reader or imported from Open Library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    /// Open Library work/edition key, used to avoid duplicate imports
    pub open_library_key: Option<String>,
    /// Mean of the ratings on review posts, `None` until the first rating
    pub average_rating: Option<f64>,
    pub ratings_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            cover_url: self.cover_url.clone(),
        }
    }
}

/// Book information embedded in posts and reading logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
}

/// Input for adding a book
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub open_library_key: Option<String>,
}

impl From<CreateBookInput> for Book {
    fn from(input: CreateBookInput) -> Self {
        Self {
            id: 0,
            title: input.title,
            author: input.author,
            isbn: input.isbn,
            cover_url: input.cover_url,
            description: input.description,
            open_library_key: input.open_library_key,
            average_rating: None,
            ratings_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A search hit, either from Open Library or from the local catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCandidate {
    /// Local id when the book already exists in the catalogue
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub open_library_key: Option<String>,
    pub publish_year: Option<i64>,
    pub page_count: Option<i64>,
    pub subjects: Vec<String>,
}

impl From<Book> for BookCandidate {
    fn from(book: Book) -> Self {
        Self {
            id: Some(book.id),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            cover_url: book.cover_url,
            description: book.description,
            open_library_key: book.open_library_key,
            publish_year: None,
            page_count: None,
            subjects: Vec::new(),
        }
    }
}

/// Book with the number of reviews it received in a trending window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingBook {
    #[serde(flatten)]
    pub book: Book,
    pub review_count: i64,
}

/// Window used to rank trending books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
    All,
}

impl TrendingPeriod {
    /// Start of the window, `None` for all time
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TrendingPeriod::Daily => Some(now - Duration::days(1)),
            TrendingPeriod::Weekly => Some(now - Duration::days(7)),
            TrendingPeriod::Monthly => Some(now - Duration::days(30)),
            TrendingPeriod::All => None,
        }
    }
}

impl fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendingPeriod::Daily => write!(f, "daily"),
            TrendingPeriod::Weekly => write!(f, "weekly"),
            TrendingPeriod::Monthly => write!(f, "monthly"),
            TrendingPeriod::All => write!(f, "all"),
        }
    }
}

impl FromStr for TrendingPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(TrendingPeriod::Daily),
            "weekly" | "week" => Ok(TrendingPeriod::Weekly),
            "monthly" | "month" => Ok(TrendingPeriod::Monthly),
            "all" => Ok(TrendingPeriod::All),
            _ => Err(anyhow::anyhow!("Invalid trending period: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trending_period_window() {
        let now = Utc::now();
        assert_eq!(TrendingPeriod::Daily.since(now), Some(now - Duration::days(1)));
        assert_eq!(TrendingPeriod::Monthly.since(now), Some(now - Duration::days(30)));
        assert_eq!(TrendingPeriod::All.since(now), None);
        assert_eq!(TrendingPeriod::default(), TrendingPeriod::Weekly);
    }

    #[test]
    fn test_trending_period_parse() {
        assert_eq!("Weekly".parse::<TrendingPeriod>().unwrap(), TrendingPeriod::Weekly);
        assert_eq!("all".parse::<TrendingPeriod>().unwrap(), TrendingPeriod::All);
        assert!("yearly".parse::<TrendingPeriod>().is_err());
    }

    #[test]
    fn test_candidate_from_book_keeps_local_id() {
        let book = Book {
            id: 3,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
            cover_url: None,
            description: None,
            open_library_key: Some("/works/OL893415W".to_string()),
            average_rating: Some(4.5),
            ratings_count: 2,
            created_at: Utc::now(),
        };
        let candidate = BookCandidate::from(book);
        assert_eq!(candidate.id, Some(3));
        assert_eq!(candidate.open_library_key.as_deref(), Some("/works/OL893415W"));
    }
}
