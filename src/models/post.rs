//! Post model
//!
//! Posts are the content of the social feed: reviews (optionally rated),
//! fan art, plain posts and quotes, each optionally attached to a book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{BookSummary, CreateBookInput, UserSummary};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    /// Author
    pub user_id: i64,
    pub book_id: Option<i64>,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub title: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    /// 1 to 5 stars, reviews only
    pub rating: Option<i32>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reposts_count: i64,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, approved post with zeroed counters.
    pub fn new(user_id: i64, post_type: PostType, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            book_id: None,
            post_type,
            title: None,
            content,
            image_url: None,
            rating: None,
            likes_count: 0,
            comments_count: 0,
            reposts_count: 0,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this post contributes to its book's rating aggregate
    pub fn is_rated_review(&self) -> bool {
        self.post_type == PostType::Review && self.rating.is_some() && self.book_id.is_some()
    }
}

/// Kind of post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Review,
    Fanart,
    Post,
    Quote,
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostType::Review => write!(f, "review"),
            PostType::Fanart => write!(f, "fanart"),
            PostType::Post => write!(f, "post"),
            PostType::Quote => write!(f, "quote"),
        }
    }
}

impl FromStr for PostType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "review" => Ok(PostType::Review),
            "fanart" | "fan-art" => Ok(PostType::Fanart),
            "post" => Ok(PostType::Post),
            "quote" => Ok(PostType::Quote),
            _ => Err(anyhow::anyhow!("Invalid post type: {}", s)),
        }
    }
}

/// Post enriched with its author, book and the viewer's like state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub book: Option<BookSummary>,
    /// Present only when the feed is requested by a signed-in user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[serde(rename = "type")]
    pub post_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub book_id: Option<i64>,
    /// Book to create (or resolve by Open Library key) when `book_id` is absent
    #[serde(default)]
    pub book: Option<CreateBookInput>,
}

/// Input for editing a post
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<i32>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}
