//! Guest session repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::GuestSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Guest session repository trait
#[async_trait]
pub trait GuestSessionRepository: Send + Sync {
    async fn create(&self, session: &GuestSession) -> Result<GuestSession>;

    async fn get_by_session_id(&self, session_id: &str) -> Result<Option<GuestSession>>;

    /// Persist preferences, viewed content and the activity timestamp
    async fn update(&self, session: &GuestSession) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct GuestSessionRecord {
    id: i64,
    session_id: String,
    preferences: String,
    viewed_content: String,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl From<GuestSessionRecord> for GuestSession {
    fn from(r: GuestSessionRecord) -> Self {
        GuestSession {
            id: r.id,
            session_id: r.session_id,
            preferences: serde_json::from_str(&r.preferences)
                .unwrap_or_else(|_| serde_json::json!({})),
            viewed_content: serde_json::from_str(&r.viewed_content)
                .unwrap_or_else(|_| serde_json::json!([])),
            created_at: r.created_at,
            last_active_at: r.last_active_at,
        }
    }
}

/// SQLx-based guest session repository implementation
pub struct SqlxGuestSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxGuestSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GuestSessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GuestSessionRepository for SqlxGuestSessionRepository {
    async fn create(&self, session: &GuestSession) -> Result<GuestSession> {
        let preferences = session.preferences.to_string();
        let viewed = session.viewed_content.to_string();

        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO guest_sessions (session_id, preferences, viewed_content, created_at, last_active_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&session.session_id)
            .bind(&preferences)
            .bind(&viewed)
            .bind(session.created_at)
            .bind(session.last_active_at)
            .execute(pool)
            .await
            .map(|r| r.insert_id())
        })
        .context("Failed to create guest session")?;

        Ok(GuestSession {
            id,
            ..session.clone()
        })
    }

    async fn get_by_session_id(&self, session_id: &str) -> Result<Option<GuestSession>> {
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, GuestSessionRecord>(
                "SELECT id, session_id, preferences, viewed_content, created_at, last_active_at \
                 FROM guest_sessions WHERE session_id = ?",
            )
            .bind(session_id)
            .fetch_optional(pool)
            .await
        })
        .context("Failed to get guest session")?;
        Ok(record.map(GuestSession::from))
    }

    async fn update(&self, session: &GuestSession) -> Result<()> {
        let preferences = session.preferences.to_string();
        let viewed = session.viewed_content.to_string();

        with_pool!(self.pool, pool => {
            sqlx::query(
                "UPDATE guest_sessions SET preferences = ?, viewed_content = ?, last_active_at = ? \
                 WHERE session_id = ?",
            )
            .bind(&preferences)
            .bind(&viewed)
            .bind(session.last_active_at)
            .bind(&session.session_id)
            .execute(pool)
            .await
            .map(|_| ())
        })
        .context("Failed to update guest session")?;
        Ok(())
    }
}
