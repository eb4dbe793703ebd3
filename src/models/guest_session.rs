//! Guest session model
//!
//! Anonymous visitors get a session keyed by a random `guest_<uuid>` id that
//! stores their preferences and what they have looked at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSession {
    pub id: i64,
    pub session_id: String,
    pub preferences: serde_json::Value,
    pub viewed_content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl GuestSession {
    /// Generate a new session id
    pub fn generate_id() -> String {
        format!("guest_{}", uuid::Uuid::new_v4().simple())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuestSessionInput {
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub viewed_content: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = GuestSession::generate_id();
        assert!(id.starts_with("guest_"));
        assert_eq!(id.len(), "guest_".len() + 32);
        assert_ne!(id, GuestSession::generate_id());
    }
}
