//! Guest session service

use crate::db::repositories::GuestSessionRepository;
use crate::models::{GuestSession, UpdateGuestSessionInput};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GuestService {
    repo: Arc<dyn GuestSessionRepository>,
}

impl GuestService {
    pub fn new(repo: Arc<dyn GuestSessionRepository>) -> Self {
        Self { repo }
    }

    /// Start a session with the given preferences (empty object when absent)
    pub async fn create(&self, preferences: Option<Value>) -> ServiceResult<GuestSession> {
        let now = Utc::now();
        let session = GuestSession {
            id: 0,
            session_id: GuestSession::generate_id(),
            preferences: preferences
                .filter(|p| !p.is_null())
                .unwrap_or_else(|| json!({})),
            viewed_content: json!([]),
            created_at: now,
            last_active_at: now,
        };

        let session = self
            .repo
            .create(&session)
            .await
            .context("Failed to create guest session")?;
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> ServiceResult<GuestSession> {
        self.repo
            .get_by_session_id(session_id)
            .await
            .context("Failed to get guest session")?
            .ok_or_else(|| ServiceError::not_found(format!("Guest session {}", session_id)))
    }

    /// Replace preferences and/or viewed content and mark the session active
    pub async fn update(
        &self,
        session_id: &str,
        input: UpdateGuestSessionInput,
    ) -> ServiceResult<GuestSession> {
        let mut session = self.get(session_id).await?;
        if let Some(preferences) = input.preferences {
            session.preferences = preferences;
        }
        if let Some(viewed_content) = input.viewed_content {
            session.viewed_content = viewed_content;
        }
        session.last_active_at = Utc::now();

        self.repo
            .update(&session)
            .await
            .context("Failed to update guest session")?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxGuestSessionRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> GuestService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        GuestService::new(SqlxGuestSessionRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let service = setup().await;
        let session = service.create(None).await.unwrap();
        assert!(session.session_id.starts_with("guest_"));
        assert_eq!(session.preferences, json!({}));
        assert_eq!(session.viewed_content, json!([]));

        let fetched = service.get(&session.session_id).await.unwrap();
        assert_eq!(fetched.id, session.id);

        let updated = service
            .update(
                &session.session_id,
                UpdateGuestSessionInput {
                    preferences: Some(json!({ "theme": "dark" })),
                    viewed_content: Some(json!([{ "postId": 3 }])),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.preferences["theme"], "dark");
        assert!(updated.last_active_at >= session.last_active_at);

        let reloaded = service.get(&session.session_id).await.unwrap();
        assert_eq!(reloaded.viewed_content, json!([{ "postId": 3 }]));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = setup().await;
        assert!(matches!(
            service.get("guest_missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update("guest_missing", UpdateGuestSessionInput::default())
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_initial_preferences_kept() {
        let service = setup().await;
        let session = service
            .create(Some(json!({ "genres": ["fantasy"] })))
            .await
            .unwrap();
        assert_eq!(session.preferences["genres"][0], "fantasy");
    }
}
