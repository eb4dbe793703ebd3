//! Services layer - Business logic
//!
//! This module contains all business logic services for Skynote.
//! Services are responsible for:
//! - Implementing business rules and validation
//! - Coordinating between repositories
//! - Side effects of user actions (notifications, achievement sync, points)

pub mod achievement;
pub mod book;
pub mod comment;
pub mod error;
pub mod guest;
pub mod moderation;
pub mod notification;
pub mod open_library;
pub mod password;
pub mod post;
pub mod quiz;
pub mod rate_limiter;
pub mod reading;
pub mod social;
pub mod token;
pub mod user;

pub use achievement::AchievementService;
pub use book::BookService;
pub use comment::CommentService;
pub use error::{ServiceError, ServiceResult};
pub use guest::GuestService;
pub use moderation::ModerationService;
pub use notification::NotificationService;
pub use open_library::OpenLibraryClient;
pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use quiz::QuizService;
pub use rate_limiter::LoginRateLimiter;
pub use reading::ReadingService;
pub use social::SocialService;
pub use token::{Claims, TokenService};
pub use user::{Session, UserService};

use crate::config::Config;
use crate::db::repositories::{
    SqlxAchievementRepository, SqlxBookLogRepository, SqlxBookRepository,
    SqlxCommentRepository, SqlxFollowRepository, SqlxGuestSessionRepository,
    SqlxLikeRepository, SqlxModerationRepository, SqlxNotificationRepository,
    SqlxPostRepository, SqlxQuizRepository, SqlxReportRepository, SqlxRepostRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use std::sync::Arc;

/// Every service, wired against one database pool
#[derive(Clone)]
pub struct Services {
    pub users: Arc<UserService>,
    pub books: Arc<BookService>,
    pub open_library: Arc<OpenLibraryClient>,
    pub posts: Arc<PostService>,
    pub social: Arc<SocialService>,
    pub comments: Arc<CommentService>,
    pub reading: Arc<ReadingService>,
    pub achievements: Arc<AchievementService>,
    pub notifications: Arc<NotificationService>,
    pub moderation: Arc<ModerationService>,
    pub quizzes: Arc<QuizService>,
    pub guests: Arc<GuestService>,
}

impl Services {
    pub fn new(pool: &DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let book_repo = SqlxBookRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let book_log_repo = SqlxBookLogRepository::boxed(pool.clone());
        let follow_repo = SqlxFollowRepository::boxed(pool.clone());
        let achievement_repo = SqlxAchievementRepository::boxed(pool.clone());

        let open_library = Arc::new(OpenLibraryClient::new(&config.open_library)?);
        let notifications = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
            user_repo.clone(),
        ));
        let achievements = Arc::new(AchievementService::new(
            achievement_repo.clone(),
            user_repo.clone(),
            post_repo.clone(),
            book_log_repo.clone(),
            follow_repo.clone(),
            notifications.clone(),
        ));
        let users = Arc::new(UserService::new(
            user_repo.clone(),
            post_repo.clone(),
            book_log_repo.clone(),
            achievement_repo,
            &config.auth,
        ));
        let books = Arc::new(BookService::new(book_repo.clone(), open_library.clone()));
        let posts = Arc::new(PostService::new(
            post_repo.clone(),
            books.clone(),
            achievements.clone(),
        ));
        let social = Arc::new(SocialService::new(
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxRepostRepository::boxed(pool.clone()),
            follow_repo,
            post_repo.clone(),
            users.clone(),
            notifications.clone(),
            achievements.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            post_repo.clone(),
            notifications.clone(),
        ));
        let reading = Arc::new(ReadingService::new(
            book_log_repo,
            books.clone(),
            users.clone(),
            achievements.clone(),
        ));
        let moderation = Arc::new(ModerationService::new(
            SqlxReportRepository::boxed(pool.clone()),
            SqlxModerationRepository::boxed(pool.clone()),
            user_repo,
            post_repo,
            book_repo,
            posts.clone(),
        ));
        let quizzes = Arc::new(QuizService::new(
            SqlxQuizRepository::boxed(pool.clone()),
            books.clone(),
            users.clone(),
        ));
        let guests = Arc::new(GuestService::new(SqlxGuestSessionRepository::boxed(
            pool.clone(),
        )));

        Ok(Self {
            users,
            books,
            open_library,
            posts,
            social,
            comments,
            reading,
            achievements,
            notifications,
            moderation,
            quizzes,
            guests,
        })
    }
}
