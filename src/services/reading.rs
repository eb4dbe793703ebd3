//! Reading log service
//!
//! Tracks each user's status per book. Finishing a book credits
//! [`FINISH_POINTS`] once per log and every change re-syncs achievements.

use crate::db::repositories::BookLogRepository;
use crate::models::{BookLog, BookLogChange, BookLogInput, BookLogWithBook, ReadingStatus, User};
use crate::services::achievement::AchievementService;
use crate::services::book::BookService;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::user::UserService;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Points credited when a log moves into `finished`
pub const FINISH_POINTS: i64 = 10;

/// Validate the optional fields of a log request
pub fn parse_change(input: &BookLogInput) -> ServiceResult<BookLogChange> {
    let status = match input.status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<ReadingStatus>()
                .map_err(|_| ServiceError::validation(format!("Invalid reading status: {}", raw)))?,
        ),
        _ => None,
    };
    if let Some(rating) = input.rating {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::validation("Rating must be between 1 and 5"));
        }
    }
    Ok(BookLogChange {
        status,
        progress: input.progress,
        rating: input.rating,
    })
}

pub struct ReadingService {
    book_log_repo: Arc<dyn BookLogRepository>,
    books: Arc<BookService>,
    users: Arc<UserService>,
    achievements: Arc<AchievementService>,
}

impl ReadingService {
    pub fn new(
        book_log_repo: Arc<dyn BookLogRepository>,
        books: Arc<BookService>,
        users: Arc<UserService>,
        achievements: Arc<AchievementService>,
    ) -> Self {
        Self {
            book_log_repo,
            books,
            users,
            achievements,
        }
    }

    /// Create or update the actor's log for a book
    pub async fn upsert_log(&self, actor: &User, input: BookLogInput) -> ServiceResult<BookLog> {
        let change = parse_change(&input)?;
        let book_id = input
            .book_id
            .ok_or_else(|| ServiceError::validation("bookId is required"))?;
        self.books.get(book_id).await?;

        let existing = self
            .book_log_repo
            .get_for_book(actor.id, book_id)
            .await
            .context("Failed to load book log")?;

        let (log, finished_now) = match existing {
            Some(mut log) => {
                let finished_now = log.apply(&change, Utc::now());
                let log = self
                    .book_log_repo
                    .update(&log)
                    .await
                    .context("Failed to update book log")?;
                (log, finished_now)
            }
            None => {
                let mut log = BookLog::new(actor.id, book_id, ReadingStatus::WantToRead);
                let finished_now = log.apply(&change, Utc::now());
                let log = self
                    .book_log_repo
                    .create(&log)
                    .await
                    .context("Failed to create book log")?;
                (log, finished_now)
            }
        };

        self.after_change(&log, finished_now).await?;
        Ok(log)
    }

    /// Change one of the actor's logs
    pub async fn patch_log(
        &self,
        actor: &User,
        id: i64,
        input: BookLogInput,
    ) -> ServiceResult<BookLog> {
        let change = parse_change(&input)?;
        let mut log = self
            .book_log_repo
            .get_by_id(id)
            .await
            .context("Failed to load book log")?
            .ok_or_else(|| ServiceError::not_found(format!("Book log {}", id)))?;
        if log.user_id != actor.id {
            return Err(ServiceError::forbidden("You can only update your own reading log"));
        }

        let finished_now = log.apply(&change, Utc::now());
        let log = self
            .book_log_repo
            .update(&log)
            .await
            .context("Failed to update book log")?;

        self.after_change(&log, finished_now).await?;
        Ok(log)
    }

    async fn after_change(&self, log: &BookLog, finished_now: bool) -> ServiceResult<()> {
        if finished_now {
            self.users.add_points(log.user_id, FINISH_POINTS).await?;
            tracing::debug!(user_id = log.user_id, book_id = log.book_id, "Book finished");
        }
        self.achievements.sync_quietly(log.user_id).await;
        Ok(())
    }

    /// The user's logs, most recently updated first; visible to the owner only
    pub async fn list_for_user(
        &self,
        actor: &User,
        user_id: i64,
        status: Option<&str>,
    ) -> ServiceResult<Vec<BookLogWithBook>> {
        if actor.id != user_id {
            return Err(ServiceError::forbidden("Reading logs are private"));
        }
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<ReadingStatus>()
                    .map_err(|_| ServiceError::validation(format!("Invalid reading status: {}", raw)))?,
            ),
            None => None,
        };

        let logs = self
            .book_log_repo
            .list_by_user(user_id, status)
            .await
            .context("Failed to list book logs")?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateBookInput;
    use crate::services::testing::{register, TestContext};
    use proptest::prelude::*;

    async fn add_book(ctx: &TestContext, title: &str) -> i64 {
        ctx.services
            .books
            .create_or_resolve(CreateBookInput {
                title: title.into(),
                author: "Ursula K. Le Guin".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    fn log_input(book_id: i64, status: &str) -> BookLogInput {
        BookLogInput {
            book_id: Some(book_id),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_change_aliases_and_rating() {
        let change = parse_change(&BookLogInput {
            status: Some("completed".into()),
            rating: Some(4),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(change.status, Some(ReadingStatus::Finished));

        let reading = parse_change(&BookLogInput {
            status: Some("currently-reading".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(reading.status, Some(ReadingStatus::Reading));

        assert!(parse_change(&BookLogInput {
            status: Some("abandoned".into()),
            ..Default::default()
        })
        .is_err());
        assert!(parse_change(&BookLogInput {
            rating: Some(6),
            ..Default::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_log_per_book() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let book_id = add_book(&ctx, "The Dispossessed").await;
        let reading = &ctx.services.reading;

        let first = reading
            .upsert_log(&reader, log_input(book_id, "reading"))
            .await
            .unwrap();
        assert!(first.start_date.is_some());

        let second = reading
            .upsert_log(
                &reader,
                BookLogInput {
                    progress: Some(140),
                    ..log_input(book_id, "reading")
                },
            )
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.progress, 100);

        let logs = reading.list_for_user(&reader, reader.id, None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].book.title, "The Dispossessed");
    }

    #[tokio::test]
    async fn test_finishing_credits_points_once() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let book_id = add_book(&ctx, "A Wizard of Earthsea").await;
        let reading = &ctx.services.reading;

        let log = reading
            .upsert_log(&reader, log_input(book_id, "finished"))
            .await
            .unwrap();
        assert_eq!(log.progress, 100);
        assert!(log.finish_date.is_some());

        // 10 for finishing plus 10 for the "First Book" achievement
        assert_eq!(ctx.services.users.get(reader.id).await.unwrap().points, 20);

        reading
            .patch_log(&reader, log.id, BookLogInput { status: Some("finished".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ctx.services.users.get(reader.id).await.unwrap().points, 20);
    }

    #[tokio::test]
    async fn test_rereading_does_not_recredit_finish_points() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let book_id = add_book(&ctx, "The Tombs of Atuan").await;
        let reading = &ctx.services.reading;

        let log = reading
            .upsert_log(&reader, log_input(book_id, "finished"))
            .await
            .unwrap();
        let after_first = ctx.services.users.get(reader.id).await.unwrap().points;
        assert_eq!(after_first, 20);

        for _ in 0..3 {
            for status in ["reading", "finished"] {
                reading
                    .patch_log(
                        &reader,
                        log.id,
                        BookLogInput {
                            status: Some(status.into()),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
            }
        }
        reading
            .upsert_log(&reader, log_input(book_id, "reading"))
            .await
            .unwrap();
        reading
            .upsert_log(&reader, log_input(book_id, "finished"))
            .await
            .unwrap();

        assert_eq!(
            ctx.services.users.get(reader.id).await.unwrap().points,
            after_first
        );
    }

    #[tokio::test]
    async fn test_first_book_achievement_unlocks() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let book_id = add_book(&ctx, "The Left Hand of Darkness").await;

        ctx.services
            .reading
            .upsert_log(&reader, log_input(book_id, "completed"))
            .await
            .unwrap();

        let progress = ctx.services.achievements.progress_for(reader.id).await.unwrap();
        let first_book = progress
            .iter()
            .find(|p| p.achievement.name == "First Book")
            .unwrap();
        assert!(first_book.is_unlocked);
        assert_eq!(first_book.progress, 1);
    }

    #[tokio::test]
    async fn test_owner_only_access() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let other = register(&ctx, "other").await;
        let book_id = add_book(&ctx, "Lavinia").await;
        let reading = &ctx.services.reading;

        let log = reading
            .upsert_log(&reader, log_input(book_id, "want-to-read"))
            .await
            .unwrap();

        assert!(matches!(
            reading.patch_log(&other, log.id, BookLogInput::default()).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            reading.list_for_user(&other, reader.id, None).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            reading.patch_log(&reader, 999, BookLogInput::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            reading.upsert_log(&reader, log_input(999, "reading")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_filter() {
        let ctx = TestContext::new().await;
        let reader = register(&ctx, "reader").await;
        let a = add_book(&ctx, "Book A").await;
        let b = add_book(&ctx, "Book B").await;
        let reading = &ctx.services.reading;

        reading.upsert_log(&reader, log_input(a, "reading")).await.unwrap();
        reading.upsert_log(&reader, log_input(b, "finished")).await.unwrap();

        let finished = reading
            .list_for_user(&reader, reader.id, Some("finished"))
            .await
            .unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].log.book_id, b);
    }

    proptest! {
        #[test]
        fn prop_out_of_range_ratings_rejected(rating in prop_oneof![i32::MIN..1, 6..i32::MAX]) {
            let input = BookLogInput { rating: Some(rating), ..Default::default() };
            prop_assert!(parse_change(&input).is_err());
        }
    }
}
