//! Comment service

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput, Post, User};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use anyhow::Context;
use std::sync::Arc;

/// Maximum comment length in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            notifications,
        }
    }

    async fn post(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", id)))
    }

    /// Comments on a post, oldest first
    pub async fn list(&self, post_id: i64) -> ServiceResult<Vec<CommentWithAuthor>> {
        self.post(post_id).await?;
        let comments = self
            .comment_repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    pub async fn create(
        &self,
        author: &User,
        post_id: i64,
        input: CreateCommentInput,
    ) -> ServiceResult<CommentWithAuthor> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(ServiceError::validation("Comment cannot be empty"));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ServiceError::validation(format!(
                "Comment cannot exceed {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        let post = self.post(post_id).await?;

        let comment = self
            .comment_repo
            .create(author.id, post_id, content)
            .await
            .context("Failed to create comment")?;

        self.notifications
            .post_commented(author, &post, comment.id)
            .await;

        Ok(CommentWithAuthor {
            comment,
            author: author.summary(),
        })
    }

    /// Delete a comment. The comment's author, the post's author and
    /// administrators may do so.
    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let comment: Comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| ServiceError::not_found(format!("Comment {}", id)))?;

        let allowed = actor.can_manage(comment.user_id)
            || self.post(comment.post_id).await?.user_id == actor.id;
        if !allowed {
            return Err(ServiceError::forbidden("You cannot delete this comment"));
        }

        self.comment_repo
            .delete(&comment)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }
}
