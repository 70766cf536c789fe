//! Pagination parameters for list endpoints

use serde::Deserialize;

/// Default page size for list endpoints
const DEFAULT_LIMIT: i64 = 10;

/// Maximum page size for list endpoints
const MAX_LIMIT: i64 = 100;

/// Page-based pagination parameters for list endpoints.
///
/// Pages are 1-based; `limit` is the number of results per page.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    /// Get the page, defaulting to 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the limit, defaulting to 10, capped at 100
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Row offset derived from page and limit
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: None,
            limit: None,
        }
    }
}
