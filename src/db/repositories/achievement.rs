//! Achievement repository
//!
//! The achievement catalogue and per-user progress rows. Unlocking is a
//! conditional update so that concurrent syncs credit an unlock only once.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Achievement, AchievementProgress};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const ACHIEVEMENT_COLUMNS: &str = "id, name, description, category, icon, points, \
     requirement_type, requirement_count, is_active, created_at";

/// Achievement repository trait
#[async_trait]
pub trait AchievementRepository: Send + Sync {
    async fn create(&self, achievement: &Achievement) -> Result<Achievement>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Achievement>>;

    /// Active achievements ordered by category then threshold
    async fn list_active(&self) -> Result<Vec<Achievement>>;

    async fn count(&self) -> Result<i64>;

    /// Create the progress row if missing and store the current counter value
    async fn record_progress(&self, user_id: i64, achievement_id: i64, progress: i64) -> Result<()>;

    /// Flip the unlock flag if it is not set yet.
    ///
    /// Returns `true` only for the caller whose update changed the row.
    async fn try_unlock(&self, user_id: i64, achievement_id: i64, at: DateTime<Utc>) -> Result<bool>;

    /// Every active achievement with the user's progress (zero when no row)
    async fn list_progress(&self, user_id: i64) -> Result<Vec<AchievementProgress>>;

    async fn count_unlocked(&self, user_id: i64) -> Result<i64>;
}

#[derive(sqlx::FromRow)]
struct AchievementRecord {
    id: i64,
    name: String,
    description: String,
    category: String,
    icon: String,
    points: i64,
    requirement_type: String,
    requirement_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AchievementRecord> for Achievement {
    type Error = anyhow::Error;

    fn try_from(r: AchievementRecord) -> Result<Self> {
        Ok(Achievement {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category,
            icon: r.icon,
            points: r.points,
            requirement_type: r.requirement_type.parse()?,
            requirement_count: r.requirement_count,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRecord {
    #[sqlx(flatten)]
    achievement: AchievementRecord,
    progress: Option<i64>,
    is_unlocked: Option<bool>,
    unlocked_at: Option<DateTime<Utc>>,
}

/// SQLx-based achievement repository implementation
pub struct SqlxAchievementRepository {
    pool: DynDatabasePool,
}

impl SqlxAchievementRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AchievementRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AchievementRepository for SqlxAchievementRepository {
    async fn create(&self, achievement: &Achievement) -> Result<Achievement> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO achievements (name, description, category, icon, points,
                    requirement_type, requirement_count, is_active, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&achievement.name)
            .bind(&achievement.description)
            .bind(&achievement.category)
            .bind(&achievement.icon)
            .bind(achievement.points)
            .bind(achievement.requirement_type.to_string())
            .bind(achievement.requirement_count)
            .bind(achievement.is_active)
            .bind(achievement.created_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create achievement")?;

        Ok(Achievement {
            id,
            ..achievement.clone()
        })
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Achievement>> {
        let sql = format!("SELECT {} FROM achievements WHERE name = ?", ACHIEVEMENT_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, AchievementRecord>(&sql)
                .bind(name)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get achievement by name")?;
        record.map(Achievement::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Achievement>> {
        let sql = format!(
            "SELECT {} FROM achievements WHERE is_active = ? \
             ORDER BY category, requirement_count, id",
            ACHIEVEMENT_COLUMNS
        );
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, AchievementRecord>(&sql)
                .bind(true)
                .fetch_all(pool)
                .await
        })
        .context("Failed to list achievements")?;
        records.into_iter().map(Achievement::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM achievements")
                .fetch_one(pool)
                .await
        })
        .context("Failed to count achievements")?;
        Ok(count)
    }

    async fn record_progress(&self, user_id: i64, achievement_id: i64, progress: i64) -> Result<()> {
        let ensure = format!(
            "{} INTO user_achievements (user_id, achievement_id, progress, is_unlocked) \
             VALUES (?, ?, 0, ?)",
            self.pool.driver().insert_ignore()
        );

        with_pool!(self.pool, pool => {
            sqlx::query(&ensure)
                .bind(user_id)
                .bind(achievement_id)
                .bind(false)
                .execute(pool)
                .await
                .context("Failed to create achievement progress")?;
            sqlx::query("UPDATE user_achievements SET progress = ? WHERE user_id = ? AND achievement_id = ?")
                .bind(progress)
                .bind(user_id)
                .bind(achievement_id)
                .execute(pool)
                .await
                .context("Failed to store achievement progress")?;
        });
        Ok(())
    }

    async fn try_unlock(&self, user_id: i64, achievement_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let changed = with_pool!(self.pool, pool => {
            sqlx::query(
                "UPDATE user_achievements SET is_unlocked = ?, unlocked_at = ? \
                 WHERE user_id = ? AND achievement_id = ? AND is_unlocked = ?",
            )
            .bind(true)
            .bind(at)
            .bind(user_id)
            .bind(achievement_id)
            .bind(false)
            .execute(pool)
            .await
            .map(|r| r.rows_affected())
        })
        .context("Failed to unlock achievement")?;
        Ok(changed == 1)
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<AchievementProgress>> {
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, ProgressRecord>(
                r#"
                SELECT a.id, a.name, a.description, a.category, a.icon, a.points,
                       a.requirement_type, a.requirement_count, a.is_active, a.created_at,
                       ua.progress, ua.is_unlocked, ua.unlocked_at
                FROM achievements a
                LEFT JOIN user_achievements ua
                    ON ua.achievement_id = a.id AND ua.user_id = ?
                WHERE a.is_active = ?
                ORDER BY a.category, a.requirement_count, a.id
                "#,
            )
            .bind(user_id)
            .bind(true)
            .fetch_all(pool)
            .await
        })
        .context("Failed to list achievement progress")?;

        records
            .into_iter()
            .map(|r| {
                Ok(AchievementProgress {
                    achievement: Achievement::try_from(r.achievement)?,
                    progress: r.progress.unwrap_or(0),
                    is_unlocked: r.is_unlocked.unwrap_or(false),
                    unlocked_at: r.unlocked_at,
                })
            })
            .collect()
    }

    async fn count_unlocked(&self, user_id: i64) -> Result<i64> {
        let count = with_pool!(self.pool, pool => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM user_achievements WHERE user_id = ? AND is_unlocked = ?",
            )
            .bind(user_id)
            .bind(true)
            .fetch_one(pool)
            .await
        })
        .context("Failed to count unlocked achievements")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{RequirementKind, User};

    async fn setup() -> (SqlxAchievementRepository, i64, Achievement) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("a".into(), "a@example.com".into(), "h".into(), "A".into(), false))
            .await
            .unwrap();
        let repo = SqlxAchievementRepository::new(pool);
        let achievement = repo
            .create(&Achievement {
                id: 0,
                name: "First Book".into(),
                description: "Finish a book".into(),
                category: "bookworm".into(),
                icon: "📖".into(),
                points: 10,
                requirement_type: RequirementKind::BooksRead,
                requirement_count: 1,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        (repo, user.id, achievement)
    }

    #[tokio::test]
    async fn test_unlock_happens_once() {
        let (repo, user_id, achievement) = setup().await;

        // No progress row yet: nothing to unlock
        assert!(!repo.try_unlock(user_id, achievement.id, Utc::now()).await.unwrap());

        repo.record_progress(user_id, achievement.id, 1).await.unwrap();
        assert!(repo.try_unlock(user_id, achievement.id, Utc::now()).await.unwrap());
        assert!(!repo.try_unlock(user_id, achievement.id, Utc::now()).await.unwrap());
        assert_eq!(repo.count_unlocked(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_progress_listing_defaults_to_zero() {
        let (repo, user_id, achievement) = setup().await;

        let before = repo.list_progress(user_id).await.unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].progress, 0);
        assert!(!before[0].is_unlocked);

        repo.record_progress(user_id, achievement.id, 3).await.unwrap();
        repo.record_progress(user_id, achievement.id, 2).await.unwrap();
        let after = repo.list_progress(user_id).await.unwrap();
        assert_eq!(after[0].progress, 2);
    }

    #[tokio::test]
    async fn test_catalogue_queries() {
        let (repo, _user_id, _achievement) = setup().await;
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
        assert!(repo.get_by_name("First Book").await.unwrap().is_some());
        assert!(repo.get_by_name("Missing").await.unwrap().is_none());
    }
}
