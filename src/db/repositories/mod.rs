//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity; multi-table
//! moderation work lives in [`moderation`].

pub mod achievement;
pub mod book;
pub mod book_log;
pub mod comment;
pub mod follow;
pub mod guest_session;
pub mod like;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod quiz;
pub mod report;
pub mod repost;
pub mod user;

pub use achievement::{AchievementRepository, SqlxAchievementRepository};
pub use book::{BookRepository, SqlxBookRepository};
pub use book_log::{BookLogRepository, SqlxBookLogRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use guest_session::{GuestSessionRepository, SqlxGuestSessionRepository};
pub use like::{LikeRepository, SqlxLikeRepository};
pub use moderation::{ModerationRepository, SqlxModerationRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use quiz::{QuizRepository, SqlxQuizRepository};
pub use report::{ReportRepository, SqlxReportRepository};
pub use repost::{RepostRepository, SqlxRepostRepository};
pub use user::{SqlxUserRepository, UserRepository};
