//! Service error type shared by every service

/// Error types for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing, invalid or expired credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Authenticated but not allowed to act on the resource
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unique constraint or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many attempts
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Open Library unreachable or returned garbage
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

/// Result alias used across the services layer
pub type ServiceResult<T> = Result<T, ServiceError>;
