//! Content report repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ContentReport, ReportStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const REPORT_COLUMNS: &str =
    "id, reporter_id, post_id, reason, description, status, reviewed_by, reviewed_at, created_at";

/// Report repository trait
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(
        &self,
        reporter_id: Option<i64>,
        post_id: i64,
        reason: &str,
        description: Option<&str>,
    ) -> Result<ContentReport>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ContentReport>>;

    /// Reports newest first, optionally filtered by status
    async fn list(&self, status: Option<ReportStatus>) -> Result<Vec<ContentReport>>;

    /// Record a moderation decision
    async fn set_status(
        &self,
        id: i64,
        status: ReportStatus,
        reviewed_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<ContentReport>>;

    /// Count reports, optionally only those in one status
    async fn count(&self, status: Option<ReportStatus>) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct ReportRecord {
    id: i64,
    reporter_id: Option<i64>,
    post_id: Option<i64>,
    reason: String,
    description: Option<String>,
    status: String,
    reviewed_by: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRecord> for ContentReport {
    type Error = anyhow::Error;

    fn try_from(r: ReportRecord) -> Result<Self> {
        Ok(ContentReport {
            id: r.id,
            reporter_id: r.reporter_id,
            post_id: r.post_id,
            reason: r.reason,
            description: r.description,
            status: r.status.parse()?,
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at,
            created_at: r.created_at,
        })
    }
}

/// SQLx-based report repository implementation
pub struct SqlxReportRepository {
    pool: DynDatabasePool,
}

impl SqlxReportRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReportRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReportRepository for SqlxReportRepository {
    async fn create(
        &self,
        reporter_id: Option<i64>,
        post_id: i64,
        reason: &str,
        description: Option<&str>,
    ) -> Result<ContentReport> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO content_reports (reporter_id, post_id, reason, description, status, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(reporter_id)
            .bind(post_id)
            .bind(reason)
            .bind(description)
            .bind(ReportStatus::Pending.to_string())
            .bind(Utc::now())
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create report")?;

        self.get_by_id(id)
            .await?
            .context("Report not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContentReport>> {
        let sql = format!("SELECT {} FROM content_reports WHERE id = ?", REPORT_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, ReportRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get report by ID")?;
        record.map(ContentReport::try_from).transpose()
    }

    async fn list(&self, status: Option<ReportStatus>) -> Result<Vec<ContentReport>> {
        let filter = if status.is_some() { " WHERE status = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM content_reports{} ORDER BY created_at DESC, id DESC",
            REPORT_COLUMNS, filter
        );
        let status_name = status.map(|s| s.to_string());

        let records = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_as::<_, ReportRecord>(&sql);
            if let Some(status_name) = &status_name {
                query = query.bind(status_name);
            }
            query.fetch_all(pool).await
        })
        .context("Failed to list reports")?;
        records.into_iter().map(ContentReport::try_from).collect()
    }

    async fn set_status(
        &self,
        id: i64,
        status: ReportStatus,
        reviewed_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<ContentReport>> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                "UPDATE content_reports SET status = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
            )
            .bind(status.to_string())
            .bind(reviewed_by)
            .bind(at)
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .context("Failed to update report status")?;

        self.get_by_id(id).await
    }

    async fn count(&self, status: Option<ReportStatus>) -> Result<i64> {
        let sql = if status.is_some() {
            "SELECT COUNT(*) FROM content_reports WHERE status = ?"
        } else {
            "SELECT COUNT(*) FROM content_reports"
        };
        let status_name = status.map(|s| s.to_string());

        let count = with_pool!(self.pool, pool => {
            let mut query = sqlx::query_scalar::<_, i64>(sql);
            if let Some(status_name) = &status_name {
                query = query.bind(status_name);
            }
            query.fetch_one(pool).await
        })
        .context("Failed to count reports")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostType, User};

    #[tokio::test]
    async fn test_report_lifecycle() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let admin = SqlxUserRepository::new(pool.clone())
            .create(&User::new("adm".into(), "adm@example.com".into(), "h".into(), "Adm".into(), true))
            .await
            .unwrap();
        let post = SqlxPostRepository::new(pool.clone())
            .create(&Post::new(admin.id, PostType::Post, "questionable".into()))
            .await
            .unwrap();
        let repo = SqlxReportRepository::new(pool);

        let report = repo.create(None, post.id, "spam", Some("ads")).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.reporter_id.is_none());
        assert_eq!(repo.count(Some(ReportStatus::Pending)).await.unwrap(), 1);

        let reviewed = repo
            .set_status(report.id, ReportStatus::Dismissed, admin.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Dismissed);
        assert_eq!(reviewed.reviewed_by, Some(admin.id));
        assert!(reviewed.reviewed_at.is_some());

        assert!(repo.list(Some(ReportStatus::Pending)).await.unwrap().is_empty());
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
        assert_eq!(repo.count(None).await.unwrap(), 1);
    }
}
