//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::Deserialize;

use crate::models::ListParams;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for the feed
pub fn default_page_size() -> u32 {
    50
}

/// Largest page a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Query Types
// ============================================================================

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl From<&PaginationQuery> for ListParams {
    fn from(query: &PaginationQuery) -> Self {
        ListParams::new(query.page, query.page_size.min(MAX_PAGE_SIZE))
    }
}

/// `?status=` filter shared by reports and book logs
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        let params = ListParams::from(&query);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 50);
    }

    #[test]
    fn test_page_size_capped() {
        let query: PaginationQuery =
            serde_json::from_str(r#"{"page": 0, "pageSize": 500}"#).unwrap();
        let params = ListParams::from(&query);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PAGE_SIZE);
    }
}
