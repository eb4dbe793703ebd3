//! Moderation service
//!
//! Content reports, the admin review workflow, dashboard numbers and
//! account removal.

use crate::db::repositories::{
    BookRepository, ModerationRepository, PostRepository, ReportRepository, UserRepository,
};
use crate::models::{AdminStats, ContentReport, CreateReportInput, ReportStatus, User};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::post::PostService;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Window for counting active users
pub const ACTIVE_USER_DAYS: i64 = 30;

pub struct ModerationService {
    report_repo: Arc<dyn ReportRepository>,
    moderation_repo: Arc<dyn ModerationRepository>,
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    book_repo: Arc<dyn BookRepository>,
    posts: Arc<PostService>,
}

impl ModerationService {
    pub fn new(
        report_repo: Arc<dyn ReportRepository>,
        moderation_repo: Arc<dyn ModerationRepository>,
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        book_repo: Arc<dyn BookRepository>,
        posts: Arc<PostService>,
    ) -> Self {
        Self {
            report_repo,
            moderation_repo,
            user_repo,
            post_repo,
            book_repo,
            posts,
        }
    }

    /// File a report against a post; anonymous reports are allowed
    pub async fn create_report(
        &self,
        reporter: Option<&User>,
        input: CreateReportInput,
    ) -> ServiceResult<ContentReport> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::validation("A reason is required"));
        }
        self.posts.get_post(input.post_id).await?;

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let report = self
            .report_repo
            .create(reporter.map(|u| u.id), input.post_id, reason, description)
            .await
            .context("Failed to create report")?;
        tracing::info!(report_id = report.id, post_id = input.post_id, "Content reported");
        Ok(report)
    }

    /// Reports, newest first, optionally filtered by status
    pub async fn list_reports(&self, status: Option<&str>) -> ServiceResult<Vec<ContentReport>> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_status(raw)?),
            None => None,
        };
        let reports = self
            .report_repo
            .list(status)
            .await
            .context("Failed to list reports")?;
        Ok(reports)
    }

    /// Record a moderation decision.
    ///
    /// Approving or resolving a report takes the reported post down.
    pub async fn review_report(
        &self,
        admin: &User,
        id: i64,
        status: &str,
    ) -> ServiceResult<ContentReport> {
        let status = parse_status(status)?;
        let report = self
            .report_repo
            .get_by_id(id)
            .await
            .context("Failed to get report")?
            .ok_or_else(|| ServiceError::not_found(format!("Report {}", id)))?;

        let mut removed_post = None;
        if let (true, Some(post_id)) = (status.removes_post(), report.post_id) {
            let post = self
                .post_repo
                .get_by_id(post_id)
                .await
                .context("Failed to get reported post")?;
            if let Some(post) = post {
                self.posts.remove(&post).await?;
                removed_post = Some(post_id);
            }
        }

        let updated = self
            .report_repo
            .set_status(id, status, admin.id, Utc::now())
            .await
            .context("Failed to update report")?
            .ok_or_else(|| ServiceError::not_found(format!("Report {}", id)))?;

        tracing::info!(
            report_id = id,
            admin_id = admin.id,
            status = %status,
            removed_post = ?removed_post,
            "Report reviewed"
        );
        Ok(updated)
    }

    /// Dashboard counts; request statistics are left for the caller to fill
    pub async fn stats(&self) -> ServiceResult<AdminStats> {
        let since = Utc::now() - Duration::days(ACTIVE_USER_DAYS);
        let (total_users, total_posts, total_books, total_reports, pending_reports, active_users) =
            futures::try_join!(
                self.user_repo.count(),
                self.post_repo.count(None, None),
                self.book_repo.count(),
                self.report_repo.count(None),
                self.report_repo.count(Some(ReportStatus::Pending)),
                self.moderation_repo.count_active_users(since),
            )
            .context("Failed to compute admin stats")?;

        Ok(AdminStats {
            total_users,
            total_posts,
            total_books,
            total_reports,
            pending_reports,
            active_users,
            ..AdminStats::default()
        })
    }

    /// Delete an account and everything it owns. Admins cannot delete themselves.
    pub async fn delete_user(&self, admin: &User, id: i64) -> ServiceResult<()> {
        if admin.id == id {
            return Err(ServiceError::validation("You cannot delete your own account"));
        }
        let deleted = self
            .moderation_repo
            .delete_user_cascade(id)
            .await
            .context("Failed to delete user")?;
        if !deleted {
            return Err(ServiceError::not_found(format!("User {}", id)));
        }
        tracing::info!(user_id = id, admin_id = admin.id, "User deleted");
        Ok(())
    }
}

fn parse_status(raw: &str) -> ServiceResult<ReportStatus> {
    raw.parse()
        .map_err(|_| ServiceError::validation(format!("Invalid report status: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePostInput, PostWithMeta};
    use crate::services::testing::{register, TestContext};

    async fn post_by(ctx: &TestContext, author: &User, content: &str) -> PostWithMeta {
        ctx.services
            .posts
            .create(
                author,
                CreatePostInput {
                    post_type: "post".into(),
                    content: content.into(),
                    title: None,
                    image_url: None,
                    rating: None,
                    book_id: None,
                    book: None,
                },
            )
            .await
            .unwrap()
    }

    fn report(post_id: i64, reason: &str) -> CreateReportInput {
        CreateReportInput {
            post_id,
            reason: reason.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_report_validation() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let post = post_by(&ctx, &author, "spam spam").await;
        let moderation = &ctx.services.moderation;

        assert!(matches!(
            moderation.create_report(None, report(post.post.id, "  ")).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            moderation.create_report(None, report(999, "spam")).await,
            Err(ServiceError::NotFound(_))
        ));

        let anonymous = moderation.create_report(None, report(post.post.id, "spam")).await.unwrap();
        assert!(anonymous.reporter_id.is_none());
        assert_eq!(anonymous.status, ReportStatus::Pending);

        let signed = moderation
            .create_report(Some(&author), report(post.post.id, "oops"))
            .await
            .unwrap();
        assert_eq!(signed.reporter_id, Some(author.id));
    }

    #[tokio::test]
    async fn test_approving_report_removes_post() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let admin = ctx.admin("boss").await;
        let post = post_by(&ctx, &author, "offensive").await;
        let moderation = &ctx.services.moderation;

        let filed = moderation.create_report(None, report(post.post.id, "abuse")).await.unwrap();
        let reviewed = moderation.review_report(&admin, filed.id, "approved").await.unwrap();

        assert_eq!(reviewed.status, ReportStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(admin.id));
        assert!(reviewed.reviewed_at.is_some());
        assert!(reviewed.post_id.is_none());
        assert!(matches!(
            ctx.services.posts.get_post(post.post.id).await,
            Err(ServiceError::NotFound(_))
        ));

        // The report survives the post
        assert_eq!(moderation.list_reports(Some("approved")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dismissing_keeps_post() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let admin = ctx.admin("boss").await;
        let post = post_by(&ctx, &author, "fine").await;
        let moderation = &ctx.services.moderation;

        let filed = moderation.create_report(None, report(post.post.id, "meh")).await.unwrap();
        moderation.review_report(&admin, filed.id, "dismissed").await.unwrap();
        assert!(ctx.services.posts.get_post(post.post.id).await.is_ok());

        assert!(matches!(
            moderation.review_report(&admin, filed.id, "bogus").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            moderation.review_report(&admin, 999, "reviewed").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(moderation.list_reports(Some("pending")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        register(&ctx, "lurker").await;
        let post = post_by(&ctx, &author, "hello").await;
        ctx.services
            .moderation
            .create_report(None, report(post.post.id, "spam"))
            .await
            .unwrap();

        let stats = ctx.services.moderation.stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_posts, 1);
        assert_eq!(stats.total_reports, 1);
        assert_eq!(stats.pending_reports, 1);
        assert_eq!(stats.active_users, 1);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let ctx = TestContext::new().await;
        let admin = ctx.admin("boss").await;
        let doomed = register(&ctx, "doomed").await;
        let friend = register(&ctx, "friend").await;

        let post = post_by(&ctx, &doomed, "bye").await;
        ctx.services.social.toggle_follow(&friend, doomed.id).await.unwrap();
        ctx.services.social.toggle_follow(&doomed, friend.id).await.unwrap();
        let friends_post = post_by(&ctx, &friend, "stay").await;
        ctx.services.social.toggle_like(&doomed, friends_post.post.id).await.unwrap();

        assert!(matches!(
            ctx.services.moderation.delete_user(&admin, admin.id).await,
            Err(ServiceError::ValidationError(_))
        ));
        ctx.services.moderation.delete_user(&admin, doomed.id).await.unwrap();

        assert!(matches!(
            ctx.services.users.get(doomed.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(ctx.services.posts.get_post(post.post.id).await.is_err());

        let friend = ctx.services.users.get(friend.id).await.unwrap();
        assert_eq!(friend.followers_count, 0);
        assert_eq!(friend.following_count, 0);
        assert_eq!(
            ctx.services.posts.get_post(friends_post.post.id).await.unwrap().likes_count,
            0
        );

        assert!(matches!(
            ctx.services.moderation.delete_user(&admin, doomed.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
