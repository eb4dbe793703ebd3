//! Achievement service
//!
//! Keeps users' achievement progress in step with their activity. Every sync
//! recomputes the counters from the underlying tables instead of trusting
//! increments, so repeated or concurrent syncs converge on the same state.
//! Unlocks are permanent and credited once: only the sync whose conditional
//! update flips the unlock flag awards points and sends the notification.

use crate::db::repositories::{
    AchievementRepository, BookLogRepository, FollowRepository, PostRepository, UserRepository,
};
use crate::models::{
    Achievement, AchievementCounters, AchievementProgress, CreateAchievementInput, PostType,
    ReadingStatus, RequirementKind,
};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Catalogue seeded into an empty database:
/// (name, description, category, icon, points, requirement, threshold)
const DEFAULT_ACHIEVEMENTS: &[(&str, &str, &str, &str, i64, RequirementKind, i64)] = &[
    ("First Book", "Finish your first book", "bookworm", "📖", 10, RequirementKind::BooksRead, 1),
    ("Bookworm", "Finish 5 books", "bookworm", "🐛", 25, RequirementKind::BooksRead, 5),
    ("Reading Master", "Finish 10 books", "bookworm", "🎓", 50, RequirementKind::BooksRead, 10),
    ("Critic", "Write 5 reviews", "critic", "✍️", 20, RequirementKind::ReviewsWritten, 5),
    ("Social Butterfly", "Follow 10 readers", "social", "🦋", 15, RequirementKind::Following, 10),
    ("Popular Reader", "Gain 5 followers", "social", "⭐", 20, RequirementKind::Followers, 5),
];

pub struct AchievementService {
    achievement_repo: Arc<dyn AchievementRepository>,
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    book_log_repo: Arc<dyn BookLogRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    notifications: Arc<NotificationService>,
}

impl AchievementService {
    pub fn new(
        achievement_repo: Arc<dyn AchievementRepository>,
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        book_log_repo: Arc<dyn BookLogRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            achievement_repo,
            user_repo,
            post_repo,
            book_log_repo,
            follow_repo,
            notifications,
        }
    }

    /// Insert the default catalogue when no achievement exists yet.
    ///
    /// Returns the number of achievements created.
    pub async fn seed_defaults(&self) -> ServiceResult<usize> {
        let existing = self
            .achievement_repo
            .count()
            .await
            .context("Failed to count achievements")?;
        if existing > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        for &(name, description, category, icon, points, requirement_type, requirement_count) in
            DEFAULT_ACHIEVEMENTS
        {
            self.achievement_repo
                .create(&Achievement {
                    id: 0,
                    name: name.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                    icon: icon.to_string(),
                    points,
                    requirement_type,
                    requirement_count,
                    is_active: true,
                    created_at: now,
                })
                .await
                .with_context(|| format!("Failed to seed achievement {}", name))?;
        }

        tracing::info!(count = DEFAULT_ACHIEVEMENTS.len(), "Seeded default achievements");
        Ok(DEFAULT_ACHIEVEMENTS.len())
    }

    /// Recompute the counters achievements are measured against
    pub async fn counters(&self, user_id: i64) -> ServiceResult<AchievementCounters> {
        let (books_read, reviews_written, followers, following) = futures::try_join!(
            self.book_log_repo
                .count_by_status(user_id, ReadingStatus::Finished),
            self.post_repo.count(Some(user_id), Some(PostType::Review)),
            self.follow_repo.count_followers(user_id),
            self.follow_repo.count_following(user_id),
        )
        .context("Failed to compute achievement counters")?;

        Ok(AchievementCounters {
            books_read,
            reviews_written,
            followers,
            following,
        })
    }

    /// Bring the user's progress up to date.
    ///
    /// Returns the achievements newly unlocked by this call.
    pub async fn sync(&self, user_id: i64) -> ServiceResult<Vec<Achievement>> {
        let counters = self.counters(user_id).await?;
        let achievements = self
            .achievement_repo
            .list_active()
            .await
            .context("Failed to list achievements")?;

        let mut unlocked = Vec::new();
        for achievement in achievements {
            let progress = counters.get(achievement.requirement_type);
            self.achievement_repo
                .record_progress(user_id, achievement.id, progress)
                .await
                .context("Failed to record achievement progress")?;

            if progress < achievement.requirement_count {
                continue;
            }

            let won = self
                .achievement_repo
                .try_unlock(user_id, achievement.id, Utc::now())
                .await
                .context("Failed to unlock achievement")?;
            if !won {
                continue;
            }

            self.user_repo
                .add_points(user_id, achievement.points)
                .await
                .context("Failed to credit achievement points")?;
            self.notifications
                .achievement_unlocked(user_id, &achievement)
                .await;

            tracing::info!(
                user_id,
                achievement = %achievement.name,
                points = achievement.points,
                "Achievement unlocked"
            );
            unlocked.push(achievement);
        }

        Ok(unlocked)
    }

    /// Sync without failing the triggering action
    pub async fn sync_quietly(&self, user_id: i64) {
        if let Err(e) = self.sync(user_id).await {
            tracing::warn!(user_id, error = %e, "Achievement sync failed");
        }
    }

    pub async fn list_active(&self) -> ServiceResult<Vec<Achievement>> {
        let achievements = self
            .achievement_repo
            .list_active()
            .await
            .context("Failed to list achievements")?;
        Ok(achievements)
    }

    /// Sync, then list every active achievement with the user's progress
    pub async fn progress_for(&self, user_id: i64) -> ServiceResult<Vec<AchievementProgress>> {
        let user_exists = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .is_some();
        if !user_exists {
            return Err(ServiceError::not_found(format!("User {}", user_id)));
        }

        self.sync(user_id).await?;
        let progress = self
            .achievement_repo
            .list_progress(user_id)
            .await
            .context("Failed to list achievement progress")?;
        Ok(progress)
    }

    pub async fn create(&self, input: CreateAchievementInput) -> ServiceResult<Achievement> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Achievement name is required"));
        }
        let requirement_type: RequirementKind = input
            .requirement_type
            .parse()
            .map_err(|e: anyhow::Error| ServiceError::validation(e.to_string()))?;
        if input.requirement_count < 1 {
            return Err(ServiceError::validation("Requirement count must be at least 1"));
        }
        if input.points < 0 {
            return Err(ServiceError::validation("Points cannot be negative"));
        }
        if self
            .achievement_repo
            .get_by_name(name)
            .await
            .context("Failed to check achievement name")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Achievement '{}' already exists",
                name
            )));
        }

        let created = self
            .achievement_repo
            .create(&Achievement {
                id: 0,
                name: name.to_string(),
                description: input.description,
                category: input.category,
                icon: input.icon,
                points: input.points,
                requirement_type,
                requirement_count: input.requirement_count,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .context("Failed to create achievement")?;
        Ok(created)
    }
}
