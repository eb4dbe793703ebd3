//! Shared API response types
//!
//! This module contains response structures used across several endpoints
//! so that users are rendered the same way everywhere.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::User;
use crate::services::Session;

// ============================================================================
// User Response Types
// ============================================================================

/// Profile as returned by the API.
///
/// The email address is only included for its owner (and administrators).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: String,
    pub currently_reading: Option<String>,
    pub favorite_quote: Option<String>,
    pub is_admin: bool,
    pub points: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    /// Render with the email address
    pub fn private(user: User) -> Self {
        let email = user.email.clone();
        Self {
            email: Some(email),
            ..Self::public(user)
        }
    }

    /// Render without the email address
    pub fn public(user: User) -> Self {
        Self {
            avatar: user.avatar_url(),
            id: user.id,
            username: user.username,
            email: None,
            display_name: user.display_name,
            bio: user.bio,
            currently_reading: user.currently_reading,
            favorite_quote: user.favorite_quote,
            is_admin: user.is_admin,
            points: user.points,
            followers_count: user.followers_count,
            following_count: user.following_count,
            created_at: user.created_at,
        }
    }

    pub fn for_viewer(user: User, viewer: Option<&User>) -> Self {
        match viewer {
            Some(v) if v.id == user.id || v.is_admin => Self::private(user),
            _ => Self::public(user),
        }
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            user: UserResponse::private(session.user),
            token: session.token,
        }
    }
}

// ============================================================================
// Small Response Types
// ============================================================================

/// Generic message body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    pub following: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, is_admin: bool) -> User {
        let mut user = User::new(
            format!("user{}", id),
            format!("user{}@example.com", id),
            "hash".to_string(),
            format!("User {}", id),
            is_admin,
        );
        user.id = id;
        user
    }

    #[test]
    fn test_email_hidden_from_strangers() {
        let json = serde_json::to_value(UserResponse::for_viewer(user(1, false), None)).unwrap();
        assert!(json.get("email").is_none());
        assert!(json["avatar"].as_str().unwrap().contains("gravatar"));
        assert!(json.get("passwordHash").is_none());

        let stranger = user(2, false);
        let json =
            serde_json::to_value(UserResponse::for_viewer(user(1, false), Some(&stranger))).unwrap();
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_email_shown_to_owner_and_admin() {
        let owner = user(1, false);
        let json = serde_json::to_value(UserResponse::for_viewer(user(1, false), Some(&owner))).unwrap();
        assert_eq!(json["email"], "user1@example.com");

        let admin = user(9, true);
        let json = serde_json::to_value(UserResponse::for_viewer(user(1, false), Some(&admin))).unwrap();
        assert_eq!(json["email"], "user1@example.com");
    }
}
