//! Book repository
//!
//! Database operations for the book catalogue, including the trending ranking
//! and the rating aggregate maintained from review posts.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Book, TrendingBook};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const BOOK_COLUMNS: &str = "id, title, author, isbn, cover_url, description, open_library_key, \
     average_rating, ratings_count, created_at";

/// Book repository trait
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Create a new book
    async fn create(&self, book: &Book) -> Result<Book>;

    /// Get book by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Book>>;

    /// Get book by Open Library key
    async fn get_by_open_library_key(&self, key: &str) -> Result<Option<Book>>;

    /// Title or author substring match
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<Book>>;

    /// Most recently added books
    async fn recent(&self, limit: i64) -> Result<Vec<Book>>;

    /// Books ranked by review posts created since `since` (all time when `None`)
    async fn trending(&self, since: Option<DateTime<Utc>>, limit: i64) -> Result<Vec<TrendingBook>>;

    /// Recompute `average_rating` and `ratings_count` from rated review posts
    async fn refresh_rating(&self, book_id: i64) -> Result<()>;

    /// Count total books
    async fn count(&self) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct BookRecord {
    id: i64,
    title: String,
    author: String,
    isbn: Option<String>,
    cover_url: Option<String>,
    description: Option<String>,
    open_library_key: Option<String>,
    average_rating: Option<f64>,
    ratings_count: i64,
    created_at: DateTime<Utc>,
}

impl From<BookRecord> for Book {
    fn from(r: BookRecord) -> Self {
        Book {
            id: r.id,
            title: r.title,
            author: r.author,
            isbn: r.isbn,
            cover_url: r.cover_url,
            description: r.description,
            open_library_key: r.open_library_key,
            average_rating: r.average_rating,
            ratings_count: r.ratings_count,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrendingRecord {
    #[sqlx(flatten)]
    book: BookRecord,
    review_count: i64,
}

/// SQLx-based book repository implementation
pub struct SqlxBookRepository {
    pool: DynDatabasePool,
}

impl SqlxBookRepository {
    /// Create a new SQLx book repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn create(&self, book: &Book) -> Result<Book> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO books (title, author, isbn, cover_url, description,
                    open_library_key, average_rating, ratings_count, created_at)
                VALUES (?, ?, ?, ?, ?, ?, NULL, 0, ?)
                "#,
            )
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(&book.cover_url)
            .bind(&book.description)
            .bind(&book.open_library_key)
            .bind(book.created_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create book")?;

        self.get_by_id(id)
            .await?
            .context("Book not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get book by ID")?;
        Ok(record.map(Book::from))
    }

    async fn get_by_open_library_key(&self, key: &str) -> Result<Option<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE open_library_key = ? ORDER BY id LIMIT 1",
            BOOK_COLUMNS
        );
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookRecord>(&sql)
                .bind(key)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get book by Open Library key")?;
        Ok(record.map(Book::from))
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE LOWER(title) LIKE ? OR LOWER(author) LIKE ? \
             ORDER BY id LIMIT ?",
            BOOK_COLUMNS
        );
        let pattern = format!("%{}%", query.to_lowercase());
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookRecord>(&sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(pool)
                .await
        })
        .context("Failed to search books")?;
        Ok(records.into_iter().map(Book::from).collect())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books ORDER BY created_at DESC, id DESC LIMIT ?",
            BOOK_COLUMNS
        );
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookRecord>(&sql)
                .bind(limit)
                .fetch_all(pool)
                .await
        })
        .context("Failed to list recent books")?;
        Ok(records.into_iter().map(Book::from).collect())
    }

    async fn trending(&self, since: Option<DateTime<Utc>>, limit: i64) -> Result<Vec<TrendingBook>> {
        let since = since.unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
        let sql = r#"
            SELECT b.id, b.title, b.author, b.isbn, b.cover_url, b.description,
                   b.open_library_key, b.average_rating, b.ratings_count, b.created_at,
                   COUNT(p.id) AS review_count
            FROM books b
            LEFT JOIN posts p
                ON p.book_id = b.id AND p.post_type = 'review' AND p.created_at >= ?
            GROUP BY b.id, b.title, b.author, b.isbn, b.cover_url, b.description,
                     b.open_library_key, b.average_rating, b.ratings_count, b.created_at
            ORDER BY review_count DESC, b.average_rating DESC, b.id DESC
            LIMIT ?
        "#;
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, TrendingRecord>(sql)
                .bind(since)
                .bind(limit)
                .fetch_all(pool)
                .await
        })
        .context("Failed to rank trending books")?;

        Ok(records
            .into_iter()
            .map(|r| TrendingBook {
                book: r.book.into(),
                review_count: r.review_count,
            })
            .collect())
    }

    async fn refresh_rating(&self, book_id: i64) -> Result<()> {
        let sql = r#"
            UPDATE books SET
                average_rating = (
                    SELECT AVG(rating) FROM posts
                    WHERE book_id = ? AND post_type = 'review' AND rating IS NOT NULL
                ),
                ratings_count = (
                    SELECT COUNT(*) FROM posts
                    WHERE book_id = ? AND post_type = 'review' AND rating IS NOT NULL
                )
            WHERE id = ?
        "#;
        with_pool!(self.pool, pool => {
            sqlx::query(sql)
                .bind(book_id)
                .bind(book_id)
                .bind(book_id)
                .execute(pool)
                .await
                .map(|_| ())
        })
        .context("Failed to refresh book rating")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
                .fetch_one(pool)
                .await
        })
        .context("Failed to count books")?;
        Ok(count)
    }
}
