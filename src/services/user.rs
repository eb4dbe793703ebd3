//! User service
//!
//! Implements business logic for accounts:
//! - Registration and admin registration
//! - Login with throttling and bearer token issue/validation
//! - Profile, settings, stats and the points leaderboard
//! - Admin role management

use crate::config::AuthConfig;
use crate::db::repositories::{
    AchievementRepository, BookLogRepository, PostRepository, UserRepository,
};
use crate::models::{
    CreateUserInput, ReadingStatus, UpdateProfileInput, UpdateSettingsInput, User, UserSettings,
    UserStats,
};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::password::{check_password_strength, hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::token::TokenService;
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("username pattern is valid")
});

/// Default leaderboard size
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Validate a username: 3 to 30 letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err("Username must be 3-30 characters of letters, digits or underscores".to_string())
    }
}

/// Validate an email: something before `@`, and a dotted domain after it
pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

/// Account credentials that passed login
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    book_log_repo: Arc<dyn BookLogRepository>,
    achievement_repo: Arc<dyn AchievementRepository>,
    tokens: TokenService,
    rate_limiter: LoginRateLimiter,
    admin_registration_key: Option<String>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        book_log_repo: Arc<dyn BookLogRepository>,
        achievement_repo: Arc<dyn AchievementRepository>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            book_log_repo,
            achievement_repo,
            tokens: TokenService::from_config(auth),
            rate_limiter: LoginRateLimiter::new(),
            admin_registration_key: auth.admin_registration_key.clone(),
        }
    }

    /// Register a reader account and sign them in
    pub async fn register(&self, input: CreateUserInput) -> ServiceResult<Session> {
        let user = self.create_account(input).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        self.session_for(user)
    }

    /// Register an administrator.
    ///
    /// Requires the configured registration key; with no key configured the
    /// endpoint is closed.
    pub async fn register_admin(
        &self,
        admin_key: &str,
        mut input: CreateUserInput,
    ) -> ServiceResult<Session> {
        match self.admin_registration_key.as_deref() {
            Some(expected) if !expected.is_empty() && expected == admin_key => {}
            _ => return Err(ServiceError::forbidden("Invalid admin registration key")),
        }

        input.is_admin = true;
        let user = self.create_account(input).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Admin registered");
        self.session_for(user)
    }

    async fn create_account(&self, input: CreateUserInput) -> ServiceResult<User> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        validate_username(&username).map_err(ServiceError::ValidationError)?;
        validate_email(&email).map_err(ServiceError::ValidationError)?;
        check_password_strength(&input.password).map_err(ServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let display_name = input
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| username.clone());

        let user = User::new(username, email, password_hash, display_name, input.is_admin);
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;
        Ok(created)
    }

    fn session_for(&self, user: User) -> ServiceResult<Session> {
        let token = self.tokens.issue(&user)?;
        Ok(Session { user, token })
    }

    /// Log in with an email or username.
    ///
    /// Five failures for the same identifier within fifteen minutes lock it.
    pub async fn login(&self, identifier: &str, password: &str) -> ServiceResult<Session> {
        let identifier = identifier.trim();
        if self.rate_limiter.is_limited(identifier).await {
            tracing::warn!(identifier, "Login throttled");
            return Err(ServiceError::RateLimited(
                "Too many failed login attempts, try again in 15 minutes".to_string(),
            ));
        }

        let user = match self.find_by_identifier(identifier).await? {
            Some(user) => {
                let valid = verify_password(password, &user.password_hash)
                    .context("Failed to verify password")?;
                valid.then_some(user)
            }
            None => None,
        };
        let user = match user {
            Some(user) => user,
            None => {
                self.rate_limiter.record_failure(identifier).await;
                return Err(ServiceError::AuthenticationError(
                    "Invalid email or password".to_string(),
                ));
            }
        };

        self.rate_limiter.clear(identifier).await;
        self.session_for(user)
    }

    /// Forget expired login failures
    pub async fn cleanup_login_attempts(&self) {
        self.rate_limiter.cleanup().await;
    }

    async fn find_by_identifier(&self, identifier: &str) -> ServiceResult<Option<User>> {
        let user = if identifier.contains('@') {
            self.user_repo
                .get_by_email(&identifier.to_lowercase())
                .await
                .context("Failed to get user by email")?
        } else {
            self.user_repo
                .get_by_username(identifier)
                .await
                .context("Failed to get user by username")?
        };
        Ok(user)
    }

    /// Resolve a bearer token to the current state of its user
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self
            .tokens
            .validate(token)
            .map_err(|_| ServiceError::AuthenticationError("Invalid or expired token".to_string()))?;

        self.user_repo
            .get_by_id(claims.sub)
            .await
            .context("Failed to load token user")?
            .ok_or_else(|| ServiceError::AuthenticationError("Account no longer exists".to_string()))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let user = self.get(user_id).await?;
        if !verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?
        {
            return Err(ServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        check_password_strength(new_password).map_err(ServiceError::ValidationError)?;

        let hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user_id, &hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", id)))
    }

    /// Update the profile of `id`; only the owner may do so.
    ///
    /// Empty strings clear optional fields; an empty display name is ignored.
    pub async fn update_profile(
        &self,
        actor: &User,
        id: i64,
        input: UpdateProfileInput,
    ) -> ServiceResult<User> {
        if actor.id != id {
            return Err(ServiceError::forbidden("You can only edit your own profile"));
        }
        let mut user = self.get(id).await?;

        fn optional(value: String) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        if let Some(display_name) = input.display_name {
            let display_name = display_name.trim();
            if !display_name.is_empty() {
                user.display_name = display_name.to_string();
            }
        }
        if let Some(bio) = input.bio {
            user.bio = optional(bio);
        }
        if let Some(currently_reading) = input.currently_reading {
            user.currently_reading = optional(currently_reading);
        }
        if let Some(favorite_quote) = input.favorite_quote {
            user.favorite_quote = optional(favorite_quote);
        }
        if let Some(avatar) = input.avatar {
            user.avatar = optional(avatar);
        }
        user.updated_at = Utc::now();

        let updated = self
            .user_repo
            .update_profile(&user)
            .await
            .context("Failed to update profile")?;
        Ok(updated)
    }

    pub async fn settings(&self, actor: &User, id: i64) -> ServiceResult<UserSettings> {
        if actor.id != id {
            return Err(ServiceError::forbidden("You can only view your own settings"));
        }
        let user = self.get(id).await?;
        Ok(UserSettings::new(user.notification_preferences))
    }

    pub async fn update_settings(
        &self,
        actor: &User,
        id: i64,
        input: UpdateSettingsInput,
    ) -> ServiceResult<UserSettings> {
        if actor.id != id {
            return Err(ServiceError::forbidden("You can only change your own settings"));
        }
        let mut user = self.get(id).await?;

        if let Some(notifications) = input.notifications {
            user.notification_preferences = notifications.into();
            self.user_repo
                .update_preferences(id, &user.notification_preferences)
                .await
                .context("Failed to update notification preferences")?;
        }
        Ok(UserSettings::new(user.notification_preferences))
    }

    pub async fn stats(&self, id: i64) -> ServiceResult<UserStats> {
        let user = self.get(id).await?;
        let (posts_count, books_read, achievements_unlocked) = futures::try_join!(
            self.post_repo.count(Some(id), None),
            self.book_log_repo.count_by_status(id, ReadingStatus::Finished),
            self.achievement_repo.count_unlocked(id),
        )
        .context("Failed to compute user stats")?;

        Ok(UserStats {
            posts_count,
            books_read,
            achievements_unlocked,
            total_points: user.points,
            followers_count: user.followers_count,
            following_count: user.following_count,
        })
    }

    /// Users by points, highest first. `limit` is clamped to 1..=100.
    pub async fn leaderboard(&self, limit: Option<i64>) -> ServiceResult<Vec<User>> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT).clamp(1, 100);
        let users = self
            .user_repo
            .leaderboard(limit)
            .await
            .context("Failed to load leaderboard")?;
        Ok(users)
    }

    /// Every user, newest first
    pub async fn list_all(&self) -> ServiceResult<Vec<User>> {
        let users = self.user_repo.list().await.context("Failed to list users")?;
        Ok(users)
    }

    /// Grant or revoke admin rights. Admins cannot demote themselves.
    pub async fn set_admin(&self, actor: &User, id: i64, is_admin: bool) -> ServiceResult<User> {
        if actor.id == id && !is_admin {
            return Err(ServiceError::validation("You cannot revoke your own admin rights"));
        }
        self.get(id).await?;
        self.user_repo
            .set_admin(id, is_admin)
            .await
            .context("Failed to update admin flag")?;
        tracing::info!(admin_id = actor.id, user_id = id, is_admin, "Admin flag changed");
        self.get(id).await
    }

    /// Credit points (quiz rewards, finished books)
    pub async fn add_points(&self, id: i64, points: i64) -> ServiceResult<()> {
        if points == 0 {
            return Ok(());
        }
        self.user_repo
            .add_points(id, points)
            .await
            .context("Failed to credit points")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAchievementRepository, SqlxBookLogRepository, SqlxPostRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::NotificationSettings;
    use proptest::prelude::*;

    async fn setup_with_key(key: Option<&str>) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let auth = AuthConfig {
            admin_registration_key: key.map(str::to_string),
            ..AuthConfig::default()
        };
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxBookLogRepository::boxed(pool.clone()),
            SqlxAchievementRepository::boxed(pool),
            &auth,
        )
    }

    async fn setup() -> UserService {
        setup_with_key(None).await
    }

    fn input(username: &str, email: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            display_name: None,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = setup().await;
        let session = service
            .register(input("reader_1", "Reader@Example.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(session.user.email, "reader@example.com");
        assert_eq!(session.user.display_name, "reader_1");
        assert!(!session.user.is_admin);

        let user = service.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup().await;
        for bad in [
            input("ab", "a@example.com", "secret1"),
            input("has space", "a@example.com", "secret1"),
            input("reader", "no-at-sign", "secret1"),
            input("reader", "a@localhost", "secret1"),
            input("reader", "a@example.com", "short"),
        ] {
            assert!(matches!(
                service.register(bad).await,
                Err(ServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_register_duplicates_conflict() {
        let service = setup().await;
        service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap();

        assert!(matches!(
            service.register(input("reader", "other@example.com", "secret1")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            service.register(input("other", "READER@example.com", "secret1")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_by_email_or_username() {
        let service = setup().await;
        service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap();

        assert!(service.login("reader@example.com", "secret1").await.is_ok());
        assert!(service.login("reader", "secret1").await.is_ok());
        assert!(matches!(
            service.login("reader", "wrong").await,
            Err(ServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login("ghost@example.com", "secret1").await,
            Err(ServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_throttled_after_five_failures() {
        let service = setup().await;
        service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap();

        for _ in 0..5 {
            let _ = service.login("reader@example.com", "wrong").await;
        }
        assert!(matches!(
            service.login("reader@example.com", "secret1").await,
            Err(ServiceError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_registration_requires_key() {
        let closed = setup().await;
        assert!(matches!(
            closed
                .register_admin("anything", input("boss", "boss@example.com", "secret1"))
                .await,
            Err(ServiceError::PermissionDenied(_))
        ));

        let open = setup_with_key(Some("letmein")).await;
        assert!(matches!(
            open.register_admin("nope", input("boss", "boss@example.com", "secret1"))
                .await,
            Err(ServiceError::PermissionDenied(_))
        ));
        let session = open
            .register_admin("letmein", input("boss", "boss@example.com", "secret1"))
            .await
            .unwrap();
        assert!(session.user.is_admin);
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = setup().await;
        let session = service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap();
        let id = session.user.id;

        assert!(matches!(
            service.change_password(id, "wrong", "newsecret").await,
            Err(ServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.change_password(id, "secret1", "tiny").await,
            Err(ServiceError::ValidationError(_))
        ));
        service.change_password(id, "secret1", "newsecret").await.unwrap();
        assert!(service.login("reader", "newsecret").await.is_ok());
    }

    #[tokio::test]
    async fn test_profile_update_is_owner_only_and_clears() {
        let service = setup().await;
        let me = service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap()
            .user;
        let other = service
            .register(input("other", "other@example.com", "secret1"))
            .await
            .unwrap()
            .user;

        let updated = service
            .update_profile(
                &me,
                me.id,
                UpdateProfileInput {
                    bio: Some("Loves sci-fi".into()),
                    display_name: Some("Reader One".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Loves sci-fi"));
        assert_eq!(updated.display_name, "Reader One");

        let cleared = service
            .update_profile(
                &me,
                me.id,
                UpdateProfileInput {
                    bio: Some(String::new()),
                    display_name: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.bio.is_none());
        assert_eq!(cleared.display_name, "Reader One");

        assert!(matches!(
            service.update_profile(&other, me.id, UpdateProfileInput::default()).await,
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let service = setup().await;
        let me = service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap()
            .user;

        let defaults = service.settings(&me, me.id).await.unwrap();
        assert!(!defaults.notifications.repost_notifications);

        let updated = service
            .update_settings(
                &me,
                me.id,
                UpdateSettingsInput {
                    notifications: Some(NotificationSettings {
                        repost_notifications: true,
                        like_notifications: false,
                        ..NotificationSettings::default()
                    }),
                },
            )
            .await
            .unwrap();
        assert!(updated.notifications.repost_notifications);

        let stored = service.get(me.id).await.unwrap();
        assert!(stored.notification_preferences.reposts);
        assert!(!stored.notification_preferences.likes_on_posts);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let service = setup_with_key(Some("k")).await;
        let admin = service
            .register_admin("k", input("boss", "boss@example.com", "secret1"))
            .await
            .unwrap()
            .user;
        let reader = service
            .register(input("reader", "reader@example.com", "secret1"))
            .await
            .unwrap()
            .user;

        assert!(matches!(
            service.set_admin(&admin, admin.id, false).await,
            Err(ServiceError::ValidationError(_))
        ));
        let promoted = service.set_admin(&admin, reader.id, true).await.unwrap();
        assert!(promoted.is_admin);
    }

    #[tokio::test]
    async fn test_leaderboard_and_stats() {
        let service = setup().await;
        let a = service
            .register(input("alpha", "alpha@example.com", "secret1"))
            .await
            .unwrap()
            .user;
        let b = service
            .register(input("beta", "beta@example.com", "secret1"))
            .await
            .unwrap()
            .user;
        service.add_points(b.id, 30).await.unwrap();
        service.add_points(a.id, 10).await.unwrap();

        let board = service.leaderboard(None).await.unwrap();
        assert_eq!(board[0].id, b.id);
        assert_eq!(service.leaderboard(Some(0)).await.unwrap().len(), 1);

        let stats = service.stats(b.id).await.unwrap();
        assert_eq!(stats.total_points, 30);
        assert_eq!(stats.posts_count, 0);
    }

    proptest! {
        #[test]
        fn prop_valid_usernames_accepted(name in "[A-Za-z0-9_]{3,30}") {
            prop_assert!(validate_username(&name).is_ok());
        }

        #[test]
        fn prop_short_or_long_usernames_rejected(name in "[a-z]{0,2}|[a-z]{31,40}") {
            prop_assert!(validate_username(&name).is_err());
        }
    }
}
