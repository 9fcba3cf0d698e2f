//! Search capability: a recent-post search that pages through results and
//! reports rate limiting separately from other failures.

pub mod api;
pub mod query;


use chrono::{DateTime, Utc};
use scout_core::{CoreError, Post};

pub use api::TwitterApiClient;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Oldest post time to include. `None` lets the API apply its own default
    /// horizon.
    pub start_time: Option<DateTime<Utc>>,
    pub max_results: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub posts: Vec<Post>,
    pub next_token: Option<String>,
}

/// One page request per call; callers follow `next_token` and count every
/// call against their request budget.
///
/// A rate-limited request must fail with
/// `SearchApiError::RateLimitExceeded` so that `CoreError::is_rate_limited`
/// holds.
pub trait SearchProvider {
    async fn search_page(
        &self,
        request: &SearchRequest,
        next_token: Option<&str>,
    ) -> Result<SearchPage, CoreError>;

    /// Cheap request proving the credentials and endpoint work at all.
    async fn check_connectivity(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
