//! Social graph service
//!
//! Likes, reposts and follows. Counters are maintained by the repositories
//! and only move when a row is actually inserted or deleted, so repeated
//! requests cannot inflate them.

use crate::db::repositories::{FollowRepository, LikeRepository, PostRepository, RepostRepository};
use crate::models::{LikeToggle, Post, Repost, RepostWithPost, User};
use crate::services::achievement::AchievementService;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use crate::services::user::UserService;
use anyhow::Context;
use std::sync::Arc;

pub struct SocialService {
    like_repo: Arc<dyn LikeRepository>,
    repost_repo: Arc<dyn RepostRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    post_repo: Arc<dyn PostRepository>,
    users: Arc<UserService>,
    notifications: Arc<NotificationService>,
    achievements: Arc<AchievementService>,
}

impl SocialService {
    pub fn new(
        like_repo: Arc<dyn LikeRepository>,
        repost_repo: Arc<dyn RepostRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        post_repo: Arc<dyn PostRepository>,
        users: Arc<UserService>,
        notifications: Arc<NotificationService>,
        achievements: Arc<AchievementService>,
    ) -> Self {
        Self {
            like_repo,
            repost_repo,
            follow_repo,
            post_repo,
            users,
            notifications,
            achievements,
        }
    }

    async fn post(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", id)))
    }

    /// Like the post, or remove the like if it exists
    pub async fn toggle_like(&self, actor: &User, post_id: i64) -> ServiceResult<LikeToggle> {
        let post = self.post(post_id).await?;

        let already = self
            .like_repo
            .has_liked(actor.id, post_id)
            .await
            .context("Failed to check like")?;

        let liked = if already {
            self.like_repo
                .unlike(actor.id, post_id)
                .await
                .context("Failed to remove like")?;
            false
        } else {
            let inserted = self
                .like_repo
                .like(actor.id, post_id)
                .await
                .context("Failed to add like")?;
            if inserted {
                self.notifications.post_liked(actor, &post).await;
            }
            true
        };

        let likes_count = self
            .like_repo
            .likes_count(post_id)
            .await
            .context("Failed to count likes")?;
        Ok(LikeToggle { liked, likes_count })
    }

    /// Repost a post once; a second repost is a conflict
    pub async fn repost(
        &self,
        actor: &User,
        post_id: i64,
        comment: Option<String>,
    ) -> ServiceResult<Repost> {
        let post = self.post(post_id).await?;
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let repost = self
            .repost_repo
            .create(actor.id, post_id, comment.as_deref())
            .await
            .context("Failed to create repost")?
            .ok_or_else(|| ServiceError::Conflict("You already reposted this post".to_string()))?;

        self.notifications.post_reposted(actor, &post).await;
        Ok(repost)
    }

    pub async fn unrepost(&self, actor: &User, post_id: i64) -> ServiceResult<()> {
        let removed = self
            .repost_repo
            .delete(actor.id, post_id)
            .await
            .context("Failed to delete repost")?;
        if !removed {
            return Err(ServiceError::not_found(format!("Repost of post {}", post_id)));
        }
        Ok(())
    }

    /// A user's reposts with the reposted posts, newest first
    pub async fn reposts_of(
        &self,
        user_id: i64,
        viewer: Option<i64>,
    ) -> ServiceResult<Vec<RepostWithPost>> {
        let reposts = self
            .repost_repo
            .list_by_user(user_id)
            .await
            .context("Failed to list reposts")?;

        let mut result = Vec::with_capacity(reposts.len());
        for repost in reposts {
            if let Some(post) = self
                .post_repo
                .get_with_meta(repost.post_id, viewer)
                .await
                .context("Failed to load reposted post")?
            {
                result.push(RepostWithPost { repost, post });
            }
        }
        Ok(result)
    }

    /// Follow `target_id`, or unfollow when already following.
    ///
    /// Returns whether the actor follows the target afterwards.
    pub async fn toggle_follow(&self, actor: &User, target_id: i64) -> ServiceResult<bool> {
        if actor.id == target_id {
            return Err(ServiceError::validation("You cannot follow yourself"));
        }
        self.users.get(target_id).await?;

        let following = if self.is_following(actor.id, target_id).await? {
            self.follow_repo
                .unfollow(actor.id, target_id)
                .await
                .context("Failed to unfollow")?;
            false
        } else {
            let inserted = self
                .follow_repo
                .follow(actor.id, target_id)
                .await
                .context("Failed to follow")?;
            if inserted {
                self.notifications.followed(actor, target_id).await;
            }
            true
        };

        self.sync_pair(actor.id, target_id).await;
        Ok(following)
    }

    pub async fn unfollow(&self, actor: &User, target_id: i64) -> ServiceResult<()> {
        let removed = self
            .follow_repo
            .unfollow(actor.id, target_id)
            .await
            .context("Failed to unfollow")?;
        if !removed {
            return Err(ServiceError::validation("You are not following this user"));
        }
        self.sync_pair(actor.id, target_id).await;
        Ok(())
    }

    async fn sync_pair(&self, follower_id: i64, followed_id: i64) {
        self.achievements.sync_quietly(follower_id).await;
        self.achievements.sync_quietly(followed_id).await;
    }

    pub async fn is_following(&self, follower_id: i64, followed_id: i64) -> ServiceResult<bool> {
        let following = self
            .follow_repo
            .is_following(follower_id, followed_id)
            .await
            .context("Failed to check follow")?;
        Ok(following)
    }

    pub async fn followers(&self, user_id: i64) -> ServiceResult<Vec<User>> {
        self.users.get(user_id).await?;
        let users = self
            .follow_repo
            .followers(user_id)
            .await
            .context("Failed to list followers")?;
        Ok(users)
    }

    pub async fn following(&self, user_id: i64) -> ServiceResult<Vec<User>> {
        self.users.get(user_id).await?;
        let users = self
            .follow_repo
            .following(user_id)
            .await
            .context("Failed to list following")?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePostInput, NotificationKind};
    use crate::services::testing::{register, TestContext};

    async fn post_by(ctx: &TestContext, author: &User) -> i64 {
        ctx.services
            .posts
            .create(
                author,
                CreatePostInput {
                    post_type: "post".into(),
                    content: "Currently reading Dune".into(),
                    title: None,
                    image_url: None,
                    rating: None,
                    book_id: None,
                    book: None,
                },
            )
            .await
            .unwrap()
            .post
            .id
    }

    #[tokio::test]
    async fn test_like_toggles() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let fan = register(&ctx, "fan").await;
        let post_id = post_by(&ctx, &author).await;
        let social = &ctx.services.social;

        let first = social.toggle_like(&fan, post_id).await.unwrap();
        assert_eq!(first, LikeToggle { liked: true, likes_count: 1 });

        let second = social.toggle_like(&fan, post_id).await.unwrap();
        assert_eq!(second, LikeToggle { liked: false, likes_count: 0 });

        let post = ctx.services.posts.get_post(post_id).await.unwrap();
        assert_eq!(post.likes_count, 0);

        let inbox = ctx.services.notifications.list(author.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Like);
    }

    #[tokio::test]
    async fn test_like_unknown_post() {
        let ctx = TestContext::new().await;
        let fan = register(&ctx, "fan").await;
        assert!(matches!(
            ctx.services.social.toggle_like(&fan, 404).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_repost_once() {
        let ctx = TestContext::new().await;
        let author = register(&ctx, "author").await;
        let fan = register(&ctx, "fan").await;
        let post_id = post_by(&ctx, &author).await;
        let social = &ctx.services.social;

        let repost = social
            .repost(&fan, post_id, Some("Must read".into()))
            .await
            .unwrap();
        assert_eq!(repost.comment.as_deref(), Some("Must read"));
        assert!(matches!(
            social.repost(&fan, post_id, None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(ctx.services.posts.get_post(post_id).await.unwrap().reposts_count, 1);

        let listed = social.reposts_of(fan.id, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post.post.id, post_id);

        social.unrepost(&fan, post_id).await.unwrap();
        assert!(matches!(
            social.unrepost(&fan, post_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(ctx.services.posts.get_post(post_id).await.unwrap().reposts_count, 0);
    }

    #[tokio::test]
    async fn test_follow_toggle_counts_once() {
        let ctx = TestContext::new().await;
        let a = register(&ctx, "alpha").await;
        let b = register(&ctx, "beta").await;
        let social = &ctx.services.social;

        assert!(social.toggle_follow(&a, b.id).await.unwrap());
        assert_eq!(ctx.services.users.get(b.id).await.unwrap().followers_count, 1);
        assert_eq!(ctx.services.users.get(a.id).await.unwrap().following_count, 1);
        assert!(social.is_following(a.id, b.id).await.unwrap());
        assert_eq!(social.followers(b.id).await.unwrap()[0].id, a.id);

        assert!(!social.toggle_follow(&a, b.id).await.unwrap());
        assert_eq!(ctx.services.users.get(b.id).await.unwrap().followers_count, 0);
    }

    #[tokio::test]
    async fn test_follow_errors() {
        let ctx = TestContext::new().await;
        let a = register(&ctx, "alpha").await;
        let b = register(&ctx, "beta").await;
        let social = &ctx.services.social;

        assert!(matches!(
            social.toggle_follow(&a, a.id).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            social.toggle_follow(&a, 9999).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            social.unfollow(&a, b.id).await,
            Err(ServiceError::ValidationError(_))
        ));

        social.toggle_follow(&a, b.id).await.unwrap();
        social.unfollow(&a, b.id).await.unwrap();
        assert!(social.following(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_popular_reader_unlocks_once() {
        let ctx = TestContext::new().await;
        let star = register(&ctx, "star").await;
        let mut fans = Vec::new();
        for i in 0..5 {
            fans.push(register(&ctx, &format!("fan_{}", i)).await);
        }
        for fan in &fans {
            ctx.services.social.toggle_follow(fan, star.id).await.unwrap();
        }
        assert_eq!(ctx.services.users.get(star.id).await.unwrap().points, 20);

        // Dropping below the threshold and climbing back does not re-credit
        ctx.services.social.unfollow(&fans[0], star.id).await.unwrap();
        ctx.services.social.toggle_follow(&fans[0], star.id).await.unwrap();
        assert_eq!(ctx.services.users.get(star.id).await.unwrap().points, 20);
    }
}
