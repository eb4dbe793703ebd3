//! Book log repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{BookLog, BookLogWithBook, BookSummary, ReadingStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const LOG_COLUMNS: &str = "id, user_id, book_id, status, progress, start_date, finish_date, \
     rating, created_at, updated_at";

/// Book log repository trait
#[async_trait]
pub trait BookLogRepository: Send + Sync {
    async fn create(&self, log: &BookLog) -> Result<BookLog>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BookLog>>;

    /// The log for one (user, book) pair
    async fn get_for_book(&self, user_id: i64, book_id: i64) -> Result<Option<BookLog>>;

    /// Persist status, progress, dates and rating
    async fn update(&self, log: &BookLog) -> Result<BookLog>;

    /// A user's logs with book summaries, most recently updated first
    async fn list_by_user(&self, user_id: i64, status: Option<ReadingStatus>) -> Result<Vec<BookLogWithBook>>;

    /// Number of logs in a given status
    async fn count_by_status(&self, user_id: i64, status: ReadingStatus) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct BookLogRecord {
    id: i64,
    user_id: i64,
    book_id: i64,
    status: String,
    progress: i32,
    start_date: Option<DateTime<Utc>>,
    finish_date: Option<DateTime<Utc>>,
    rating: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookLogRecord> for BookLog {
    type Error = anyhow::Error;

    fn try_from(r: BookLogRecord) -> Result<Self> {
        Ok(BookLog {
            id: r.id,
            user_id: r.user_id,
            book_id: r.book_id,
            status: r.status.parse()?,
            progress: r.progress,
            start_date: r.start_date,
            finish_date: r.finish_date,
            rating: r.rating,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookLogBookRecord {
    #[sqlx(flatten)]
    log: BookLogRecord,
    book_title: String,
    book_author: String,
    book_cover_url: Option<String>,
}

/// SQLx-based book log repository implementation
pub struct SqlxBookLogRepository {
    pool: DynDatabasePool,
}

impl SqlxBookLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookLogRepository for SqlxBookLogRepository {
    async fn create(&self, log: &BookLog) -> Result<BookLog> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO book_logs (user_id, book_id, status, progress, start_date,
                    finish_date, rating, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(log.user_id)
            .bind(log.book_id)
            .bind(log.status.to_string())
            .bind(log.progress)
            .bind(log.start_date)
            .bind(log.finish_date)
            .bind(log.rating)
            .bind(log.created_at)
            .bind(log.updated_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create book log")?;

        self.get_by_id(id)
            .await?
            .context("Book log not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BookLog>> {
        let sql = format!("SELECT {} FROM book_logs WHERE id = ?", LOG_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookLogRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get book log by ID")?;
        record.map(BookLog::try_from).transpose()
    }

    async fn get_for_book(&self, user_id: i64, book_id: i64) -> Result<Option<BookLog>> {
        let sql = format!(
            "SELECT {} FROM book_logs WHERE user_id = ? AND book_id = ?",
            LOG_COLUMNS
        );
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, BookLogRecord>(&sql)
                .bind(user_id)
                .bind(book_id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get book log")?;
        record.map(BookLog::try_from).transpose()
    }

    async fn update(&self, log: &BookLog) -> Result<BookLog> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE book_logs
                SET status = ?, progress = ?, start_date = ?, finish_date = ?, rating = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(log.status.to_string())
            .bind(log.progress)
            .bind(log.start_date)
            .bind(log.finish_date)
            .bind(log.rating)
            .bind(log.updated_at)
            .bind(log.id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .context("Failed to update book log")?;

        self.get_by_id(log.id)
            .await?
            .context("Book log not found after update")
    }

    async fn list_by_user(&self, user_id: i64, status: Option<ReadingStatus>) -> Result<Vec<BookLogWithBook>> {
        let status_filter = if status.is_some() { " AND l.status = ?" } else { "" };
        let sql = format!(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.status, l.progress, l.start_date,
                   l.finish_date, l.rating, l.created_at, l.updated_at,
                   b.title AS book_title, b.author AS book_author, b.cover_url AS book_cover_url
            FROM book_logs l
            JOIN books b ON b.id = l.book_id
            WHERE l.user_id = ?{}
            ORDER BY l.updated_at DESC, l.id DESC
            "#,
            status_filter
        );
        let status_name = status.map(|s| s.to_string());

        let records = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_as::<_, BookLogBookRecord>(&sql).bind(user_id);
            if let Some(status_name) = &status_name {
                query = query.bind(status_name);
            }
            query.fetch_all(pool).await
        })
        .context("Failed to list book logs")?;

        records
            .into_iter()
            .map(|r| {
                let log = BookLog::try_from(r.log)?;
                let book = BookSummary {
                    id: log.book_id,
                    title: r.book_title,
                    author: r.book_author,
                    cover_url: r.book_cover_url,
                };
                Ok(BookLogWithBook { log, book })
            })
            .collect()
    }

    async fn count_by_status(&self, user_id: i64, status: ReadingStatus) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM book_logs WHERE user_id = ? AND status = ?")
                .bind(user_id)
                .bind(status.to_string())
                .fetch_one(pool)
                .await
        })
        .context("Failed to count book logs")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{BookRepository, SqlxBookRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Book, BookLogChange, User};

    async fn setup() -> (SqlxBookLogRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("l".into(), "l@example.com".into(), "h".into(), "L".into(), false))
            .await
            .unwrap();
        let book = SqlxBookRepository::new(pool.clone())
            .create(&Book {
                id: 0,
                title: "Emma".into(),
                author: "Jane Austen".into(),
                isbn: None,
                cover_url: None,
                description: None,
                open_library_key: None,
                average_rating: None,
                ratings_count: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        (SqlxBookLogRepository::new(pool), user.id, book.id)
    }

    #[tokio::test]
    async fn test_create_update_and_list() {
        let (repo, user_id, book_id) = setup().await;

        let mut log = repo
            .create(&BookLog::new(user_id, book_id, ReadingStatus::Reading))
            .await
            .unwrap();
        assert!(repo.get_for_book(user_id, book_id).await.unwrap().is_some());

        log.apply(
            &BookLogChange {
                status: Some(ReadingStatus::Finished),
                ..BookLogChange::default()
            },
            Utc::now(),
        );
        let updated = repo.update(&log).await.unwrap();
        assert_eq!(updated.status, ReadingStatus::Finished);
        assert_eq!(updated.progress, 100);
        assert!(updated.finish_date.is_some());

        let finished = repo
            .list_by_user(user_id, Some(ReadingStatus::Finished))
            .await
            .unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].book.title, "Emma");
        assert!(repo
            .list_by_user(user_id, Some(ReadingStatus::WantToRead))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.count_by_status(user_id, ReadingStatus::Finished).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_one_log_per_user_and_book() {
        let (repo, user_id, book_id) = setup().await;
        repo.create(&BookLog::new(user_id, book_id, ReadingStatus::Reading))
            .await
            .unwrap();
        let duplicate = repo
            .create(&BookLog::new(user_id, book_id, ReadingStatus::WantToRead))
            .await;
        assert!(duplicate.is_err());
    }
}
