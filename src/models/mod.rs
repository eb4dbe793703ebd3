//! Data models
//!
//! This module contains all data structures used throughout Skynote.
//! Models represent:
//! - Database entities (User, Book, Post, Follow, Like, Repost, BookLog,
//!   Achievement, Notification, Comment, ContentReport, Quiz, GuestSession)
//! - API request inputs
//! - Enriched views joining several entities

mod achievement;
mod book;
mod book_log;
mod comment;
mod guest_session;
mod notification;
mod post;
mod quiz;
mod report;
mod social;
mod user;

pub use achievement::{
    Achievement, AchievementCounters, AchievementProgress, CreateAchievementInput,
    RequirementKind, UserAchievement,
};
pub use book::{Book, BookCandidate, BookSummary, CreateBookInput, TrendingBook, TrendingPeriod};
pub use book_log::{BookLog, BookLogChange, BookLogInput, BookLogWithBook, ReadingStatus};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use guest_session::{GuestSession, UpdateGuestSessionInput};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use post::{CreatePostInput, ListParams, Post, PostType, PostWithMeta, UpdatePostInput};
pub use quiz::{
    grade, points_for_score, score_percent, CreateQuizInput, Difficulty, NewQuestionInput,
    PublicQuestion, QuestionOutcome, Quiz, QuizOutcome, QuizQuestion, QuizResult,
    SubmitQuizInput,
};
pub use report::{AdminStats, ContentReport, CreateReportInput, ReportStatus};
pub use social::{Follow, Like, LikeToggle, Repost, RepostWithPost};
pub use user::{
    gravatar_url, CreateUserInput, NotificationPreferences, NotificationSettings,
    UpdateProfileInput, UpdateSettingsInput, User, UserSettings, UserStats, UserSummary,
};
