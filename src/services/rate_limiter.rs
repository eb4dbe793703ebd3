//! Rate limiter for login attempts
//!
//! Failed logins are tracked per account identifier (email or username,
//! case-insensitive). Five failures within fifteen minutes lock the
//! identifier until the oldest failure leaves the window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failures allowed inside the window
pub const MAX_FAILED_ATTEMPTS: usize = 5;

/// Window length in minutes
pub const WINDOW_MINUTES: i64 = 15;

/// Login rate limiter
pub struct LoginRateLimiter {
    attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    /// Create a rate limiter with the default limits
    pub fn new() -> Self {
        Self::with_limits(MAX_FAILED_ATTEMPTS, Duration::minutes(WINDOW_MINUTES))
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Check if the identifier is currently locked out
    pub async fn is_limited(&self, identifier: &str) -> bool {
        self.is_limited_at(identifier, Utc::now()).await
    }

    async fn is_limited_at(&self, identifier: &str, now: DateTime<Utc>) -> bool {
        let mut attempts = self.attempts.write().await;
        let cutoff = now - self.window;

        match attempts.get_mut(&identifier.to_lowercase()) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= self.max_attempts
            }
            None => false,
        }
    }

    /// Record a failed login attempt
    pub async fn record_failure(&self, identifier: &str) {
        self.record_failure_at(identifier, Utc::now()).await;
    }

    async fn record_failure_at(&self, identifier: &str, at: DateTime<Utc>) {
        let mut attempts = self.attempts.write().await;
        attempts
            .entry(identifier.to_lowercase())
            .or_default()
            .push(at);
    }

    /// Clear failures after a successful login
    pub async fn clear(&self, identifier: &str) {
        let mut attempts = self.attempts.write().await;
        attempts.remove(&identifier.to_lowercase());
    }

    /// Drop expired entries
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locks_after_five_failures() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            limiter.record_failure("reader@example.com").await;
            assert!(!limiter.is_limited("reader@example.com").await);
        }
        limiter.record_failure("reader@example.com").await;
        assert!(limiter.is_limited("reader@example.com").await);

        limiter.clear("reader@example.com").await;
        assert!(!limiter.is_limited("reader@example.com").await);
    }

    #[tokio::test]
    async fn test_identifier_is_case_insensitive() {
        let limiter = LoginRateLimiter::new();
        for id in ["Reader", "READER", "reader", "ReAdEr", "rEADER"] {
            limiter.record_failure(id).await;
        }
        assert!(limiter.is_limited("reader").await);
        assert!(!limiter.is_limited("someone-else").await);
    }

    #[tokio::test]
    async fn test_old_failures_expire() {
        let limiter = LoginRateLimiter::new();
        let long_ago = Utc::now() - Duration::minutes(WINDOW_MINUTES + 1);
        for _ in 0..MAX_FAILED_ATTEMPTS {
            limiter.record_failure_at("reader", long_ago).await;
        }
        assert!(!limiter.is_limited("reader").await);

        limiter.cleanup().await;
        assert!(limiter.attempts.read().await.is_empty());
    }
}
