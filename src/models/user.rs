//! User model
//!
//! This module defines the User entity, the public summary embedded in other
//! payloads, and the notification preferences stored alongside each account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Name shown next to posts
    pub display_name: String,
    pub bio: Option<String>,
    /// Avatar URL; a gravatar is derived from the email when unset
    pub avatar: Option<String>,
    pub currently_reading: Option<String>,
    pub favorite_quote: Option<String>,
    pub is_admin: bool,
    /// Running total of earned points
    pub points: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub notification_preferences: NotificationPreferences,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// Note: The password should already be hashed before calling this function.
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        display_name: String,
        is_admin: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            display_name,
            bio: None,
            avatar: None,
            currently_reading: None,
            favorite_quote: None,
            is_admin,
            points: 0,
            followers_count: 0,
            following_count: 0,
            notification_preferences: NotificationPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Avatar to display: the stored one, or an identicon gravatar for the email
    pub fn avatar_url(&self) -> String {
        match self.avatar.as_deref() {
            Some(avatar) if !avatar.is_empty() => avatar.to_string(),
            _ => gravatar_url(&self.email),
        }
    }

    /// Check if the user may modify content owned by `owner_id`
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin || self.id == owner_id
    }

    /// Public summary used when embedding the user in other payloads
    pub fn summary(&self) -> UserSummary {
        UserSummary::new(
            self.id,
            self.username.clone(),
            self.display_name.clone(),
            self.avatar.clone(),
            &self.email,
        )
    }
}

/// Gravatar identicon URL for an email address
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?d=identicon", digest)
}

/// Author information embedded in posts, comments and follow lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

impl UserSummary {
    /// Build a summary, falling back to a gravatar when no avatar is stored
    pub fn new(
        id: i64,
        username: String,
        display_name: String,
        avatar: Option<String>,
        email: &str,
    ) -> Self {
        let avatar = match avatar {
            Some(avatar) if !avatar.is_empty() => avatar,
            _ => gravatar_url(email),
        };
        Self {
            id,
            username,
            display_name,
            avatar: Some(avatar),
        }
    }
}

/// Which events produce a notification for the user.
///
/// Stored as JSON on the user row. Every flag defaults to on except reposts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    pub new_followers: bool,
    pub likes_on_posts: bool,
    pub comments: bool,
    pub reposts: bool,
    pub email_notifications: bool,
    pub push_notifications: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            new_followers: true,
            likes_on_posts: true,
            comments: true,
            reposts: false,
            email_notifications: true,
            push_notifications: true,
        }
    }
}

/// Aggregated profile numbers shown on the profile page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub posts_count: i64,
    pub books_read: i64,
    pub achievements_unlocked: i64,
    pub total_points: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Display name (defaults to the username)
    pub display_name: Option<String>,
    /// Whether the account is created with admin rights
    pub is_admin: bool,
}

/// Input for updating a profile.
///
/// `None` leaves a field unchanged; an empty string clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub currently_reading: Option<String>,
    pub favorite_quote: Option<String>,
    pub avatar: Option<String>,
}

/// Notification section of the settings page.
///
/// Field names follow the settings form; they map onto the stored
/// [`NotificationPreferences`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub follow_notifications: bool,
    pub like_notifications: bool,
    pub comment_notifications: bool,
    pub repost_notifications: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationPreferences::default().into()
    }
}

impl From<NotificationPreferences> for NotificationSettings {
    fn from(p: NotificationPreferences) -> Self {
        Self {
            email_notifications: p.email_notifications,
            push_notifications: p.push_notifications,
            follow_notifications: p.new_followers,
            like_notifications: p.likes_on_posts,
            comment_notifications: p.comments,
            repost_notifications: p.reposts,
        }
    }
}

impl From<NotificationSettings> for NotificationPreferences {
    fn from(s: NotificationSettings) -> Self {
        Self {
            new_followers: s.follow_notifications,
            likes_on_posts: s.like_notifications,
            comments: s.comment_notifications,
            reposts: s.repost_notifications,
            email_notifications: s.email_notifications,
            push_notifications: s.push_notifications,
        }
    }
}

/// Full settings document.
///
/// Only `notifications` is persisted; the other sections are fixed defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub profile: serde_json::Value,
    pub notifications: NotificationSettings,
    pub privacy: serde_json::Value,
    pub reading: serde_json::Value,
}

impl UserSettings {
    pub fn new(preferences: NotificationPreferences) -> Self {
        Self {
            profile: serde_json::json!({ "isProfilePublic": true }),
            notifications: preferences.into(),
            privacy: serde_json::json!({
                "showReadingActivity": true,
                "allowFollowers": true,
                "showAchievements": true,
                "dataSharing": false,
            }),
            reading: serde_json::json!({
                "yearlyGoal": 24,
                "preferredGenres": ["Fiction"],
                "readingReminders": true,
                "shareProgress": true,
            }),
        }
    }
}

/// Settings update; sections other than `notifications` are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    #[serde(default)]
    pub notifications: Option<NotificationSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> User {
        User::new(
            "reader".to_string(),
            "Reader@Example.com ".to_string(),
            "hash".to_string(),
            "Reader".to_string(),
            false,
        )
    }

    #[test]
    fn test_new_user_defaults() {
        let user = reader();
        assert_eq!(user.id, 0);
        assert_eq!(user.points, 0);
        assert!(!user.is_admin);
        assert_eq!(user.notification_preferences, NotificationPreferences::default());
    }

    #[test]
    fn test_avatar_falls_back_to_gravatar() {
        let mut user = reader();
        let url = user.avatar_url();
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert_eq!(url, gravatar_url("reader@example.com"));

        user.avatar = Some("https://img.example/me.png".to_string());
        assert_eq!(user.avatar_url(), "https://img.example/me.png");
    }

    #[test]
    fn test_can_manage() {
        let mut user = reader();
        user.id = 7;
        assert!(user.can_manage(7));
        assert!(!user.can_manage(8));
        user.is_admin = true;
        assert!(user.can_manage(8));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(reader()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["displayName"], "Reader");
    }

    #[test]
    fn test_preferences_defaults_and_partial_json() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.new_followers && prefs.likes_on_posts && prefs.comments);
        assert!(!prefs.reposts);

        let parsed: NotificationPreferences =
            serde_json::from_str(r#"{"reposts":true,"comments":false}"#).unwrap();
        assert!(parsed.reposts);
        assert!(!parsed.comments);
        assert!(parsed.new_followers);
    }

    #[test]
    fn test_settings_map_onto_preferences() {
        let settings = UserSettings::new(NotificationPreferences::default());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["notifications"]["followNotifications"], true);
        assert_eq!(json["notifications"]["repostNotifications"], false);
        assert_eq!(json["reading"]["yearlyGoal"], 24);

        let input: NotificationSettings =
            serde_json::from_str(r#"{"likeNotifications":false,"repostNotifications":true}"#)
                .unwrap();
        let prefs = NotificationPreferences::from(input);
        assert!(!prefs.likes_on_posts);
        assert!(prefs.reposts);
        assert!(prefs.new_followers);
    }
}
