use chrono::{DateTime, Duration, Utc};
use scout_core::{
    CoreError, ErrorReporter, Post, RetryExecutor, RetryPolicy, RunState, SearchSettings, Ticker,
    WaitPolicy,
};
use std::cell::Cell;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use twitter_client::query::{exchange_group_query, ticker_query};
use twitter_client::{SearchProvider, SearchRequest};

/// Start of the search window: the regular lookback once a prior run is on
/// record, the longer first-run lookback otherwise.
pub fn lookback_start(
    run_state: &RunState,
    now: DateTime<Utc>,
    settings: &SearchSettings,
) -> DateTime<Utc> {
    let hours = if run_state.is_first_run() {
        settings.first_run_lookback_hours
    } else {
        settings.lookback_hours
    };
    now - Duration::hours(hours)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    pub groups_searched: usize,
    pub groups_failed: usize,
    pub groups_skipped: usize,
    pub rate_limit_events: usize,
    pub posts_fetched: usize,
    pub duplicate_posts: usize,
    pub supplemental_searches: usize,
    pub requests_used: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagedOutcome {
    Complete,
    RateLimited,
    BudgetExhausted,
    Failed,
}

/// Issues the run's searches against a shared request budget. Every page
/// request counts, including retries and supplemental searches.
pub struct SearchOrchestrator<'a, S> {
    provider: &'a S,
    settings: SearchSettings,
    wait: WaitPolicy,
    retry: RetryExecutor,
    reporter: ErrorReporter,
    requests_used: Cell<u32>,
    stats: SearchStats,
}

impl<'a, S: SearchProvider> SearchOrchestrator<'a, S> {
    pub fn new(
        provider: &'a S,
        settings: SearchSettings,
        wait: WaitPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            settings,
            wait,
            retry: RetryExecutor::new(retry),
            reporter: ErrorReporter::new("search"),
            requests_used: Cell::new(0),
            stats: SearchStats::default(),
        }
    }

    pub fn requests_used(&self) -> u32 {
        self.requests_used.get()
    }

    pub fn budget_remaining(&self) -> u32 {
        self.settings
            .request_budget
            .saturating_sub(self.requests_used.get())
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            requests_used: self.requests_used.get(),
            ..self.stats.clone()
        }
    }

    /// One paged search per exchange group. Posts are de-duplicated by id,
    /// first occurrence wins. A failing group contributes whatever it fetched
    /// before failing and never stops the remaining groups.
    pub async fn search_groups(
        &mut self,
        groups: &[Vec<String>],
        start_time: DateTime<Utc>,
    ) -> Vec<Post> {
        let mut seen_ids = HashSet::new();
        let mut candidates = Vec::new();

        for (index, group) in groups.iter().enumerate() {
            info!("Searching for tweets mentioning: {}...", group.join(", "));
            let request = SearchRequest {
                query: exchange_group_query(group),
                start_time: Some(start_time),
                max_results: self.settings.max_results_per_page,
            };
            let label = format!("search group {}/{} ({})", index + 1, groups.len(), group.join(", "));

            let (posts, outcome) = self
                .search_paged(&label, &request, self.settings.max_pages)
                .await;
            match outcome {
                PagedOutcome::BudgetExhausted if posts.is_empty() => {
                    self.stats.groups_skipped += 1;
                    continue;
                }
                PagedOutcome::Failed => self.stats.groups_failed += 1,
                _ => {}
            }
            self.stats.groups_searched += 1;

            if posts.is_empty() {
                info!("  No tweets found for this group");
            } else {
                info!("  Found {} tweets for this group", posts.len());
            }
            self.stats.posts_fetched += posts.len();

            for post in posts {
                if seen_ids.insert(post.id.clone()) {
                    candidates.push(post);
                } else {
                    self.stats.duplicate_posts += 1;
                }
            }
        }

        info!("Total tweets collected: {}", candidates.len());
        if self.stats.duplicate_posts > 0 {
            debug!(
                "Dropped {} posts already returned by an earlier group",
                self.stats.duplicate_posts
            );
        }
        candidates
    }

    /// Single-page targeted search for a ticker as plain text, without a
    /// time window.
    pub async fn search_ticker(&mut self, ticker: &Ticker, max_results: u32) -> Vec<Post> {
        let request = SearchRequest {
            query: ticker_query(ticker.as_str()),
            start_time: None,
            max_results,
        };
        let label = format!("supplemental search for ${}", ticker);

        self.stats.supplemental_searches += 1;
        let (posts, _) = self.search_paged(&label, &request, 1).await;
        if posts.is_empty() {
            info!("  No additional tweets found for {}", ticker);
        } else {
            info!("  Collected {} additional tweets about {}", posts.len(), ticker);
        }
        posts
    }

    async fn search_paged(
        &mut self,
        label: &str,
        request: &SearchRequest,
        max_pages: u32,
    ) -> (Vec<Post>, PagedOutcome) {
        let mut posts = Vec::new();
        let mut next_token: Option<String> = None;

        for page in 0..max_pages {
            let provider = self.provider;
            let counter = &self.requests_used;
            let budget = self.settings.request_budget;
            let token = next_token.as_deref();

            let result = self
                .retry
                .execute(label, move || async move {
                    let used = counter.get();
                    if used >= budget {
                        return Err(CoreError::BudgetExhausted { used });
                    }
                    counter.set(used + 1);
                    provider.search_page(request, token).await
                })
                .await;

            match result {
                Ok(result_page) => {
                    debug!(
                        "{}: page {} returned {} posts",
                        label,
                        page + 1,
                        result_page.posts.len()
                    );
                    posts.extend(result_page.posts);
                    match result_page.next_token {
                        Some(token) => next_token = Some(token),
                        None => return (posts, PagedOutcome::Complete),
                    }
                }
                Err(CoreError::BudgetExhausted { used }) => {
                    warn!(
                        "Request budget exhausted after {} requests; skipping {}",
                        used, label
                    );
                    return (posts, PagedOutcome::BudgetExhausted);
                }
                Err(e) if e.is_rate_limited() => {
                    self.stats.rate_limit_events += 1;
                    self.reporter.report_warning(label, &e);
                    self.wait.rate_limit_cooldown().await;
                    return (posts, PagedOutcome::RateLimited);
                }
                Err(e) => {
                    self.reporter.report_error(label, &e);
                    return (posts, PagedOutcome::Failed);
                }
            }
        }

        (posts, PagedOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scout_core::SearchApiError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use twitter_client::SearchPage;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            text: format!("post {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 5, 13, 10, 0, 0).unwrap(),
            author: None,
            like_count: 0,
            share_count: 0,
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<SearchPage, CoreError> {
        Ok(SearchPage {
            posts: ids.iter().map(|id| post(id)).collect(),
            next_token: next.map(str::to_string),
        })
    }

    #[derive(Default)]
    struct ScriptedSearch {
        responses: Mutex<VecDeque<Result<SearchPage, CoreError>>>,
        calls: Mutex<Vec<(SearchRequest, Option<String>)>>,
    }

    impl ScriptedSearch {
        fn new(responses: Vec<Result<SearchPage, CoreError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(SearchRequest, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SearchProvider for ScriptedSearch {
        async fn search_page(
            &self,
            request: &SearchRequest,
            next_token: Option<&str>,
        ) -> Result<SearchPage, CoreError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.clone(), next_token.map(str::to_string)));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchPage::default()))
        }
    }

    fn groups() -> Vec<Vec<String>> {
        vec![
            vec!["coinbase".to_string(), "binance".to_string()],
            vec!["kraken".to_string()],
        ]
    }

    fn orchestrator(provider: &ScriptedSearch, settings: SearchSettings) -> SearchOrchestrator<'_, ScriptedSearch> {
        SearchOrchestrator::new(provider, settings, WaitPolicy::immediate(), RetryPolicy::no_retry())
    }

    #[test]
    fn test_lookback_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 13, 12, 0, 0).unwrap();
        let settings = SearchSettings::default();

        let first = lookback_start(&RunState::default(), now, &settings);
        assert_eq!(now - first, Duration::hours(12));

        let later = lookback_start(
            &RunState {
                last_check: Some(now - Duration::hours(30)),
            },
            now,
            &settings,
        );
        assert_eq!(now - later, Duration::hours(6));
    }

    #[tokio::test]
    async fn test_groups_follow_pagination_and_dedupe() {
        let provider = ScriptedSearch::new(vec![
            page(&["1", "2"], Some("next")),
            page(&["3"], None),
            page(&["2", "4"], None),
        ]);
        let start = Utc.with_ymd_and_hms(2024, 5, 13, 6, 0, 0).unwrap();
        let mut search = orchestrator(&provider, SearchSettings::default());

        let posts = search.search_groups(&groups(), start).await;

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        let stats = search.stats();
        assert_eq!(stats.requests_used, 3);
        assert_eq!(stats.duplicate_posts, 1);
        assert_eq!(stats.posts_fetched, 5);

        let calls = provider.calls();
        assert_eq!(calls[0].0.query, r#"("coinbase" OR "binance") -is:retweet"#);
        assert_eq!(calls[0].0.start_time, Some(start));
        assert_eq!(calls[0].0.max_results, 25);
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_deref(), Some("next"));
        assert_eq!(calls[2].0.query, r#"("kraken") -is:retweet"#);
    }

    #[tokio::test]
    async fn test_page_cap() {
        let provider = ScriptedSearch::new(vec![
            page(&["1"], Some("a")),
            page(&["2"], Some("b")),
            page(&["3"], Some("c")),
        ]);
        let settings = SearchSettings {
            max_pages: 2,
            ..SearchSettings::default()
        };
        let mut search = orchestrator(&provider, settings);

        let posts = search
            .search_groups(&groups()[..1], Utc::now())
            .await;

        assert_eq!(posts.len(), 2);
        assert_eq!(search.requests_used(), 2);
    }

    #[tokio::test]
    async fn test_failing_group_keeps_partial_results_and_continues() {
        let provider = ScriptedSearch::new(vec![
            page(&["1"], Some("more")),
            Err(CoreError::SearchApi(SearchApiError::ServerError { status_code: 503 })),
            page(&["2"], None),
        ]);
        let mut search = orchestrator(&provider, SearchSettings::default());

        let posts = search.search_groups(&groups(), Utc::now()).await;

        assert_eq!(posts.len(), 2);
        let stats = search.stats();
        assert_eq!(stats.groups_failed, 1);
        assert_eq!(stats.groups_searched, 2);
    }

    #[tokio::test]
    async fn test_rate_limit_waits_and_moves_on() {
        let provider = ScriptedSearch::new(vec![
            Err(CoreError::SearchApi(SearchApiError::RateLimitExceeded {
                retry_after: 900,
            })),
            page(&["7"], None),
        ]);
        let mut search = orchestrator(&provider, SearchSettings::default());

        let posts = search.search_groups(&groups(), Utc::now()).await;

        assert_eq!(posts.len(), 1);
        assert_eq!(search.stats().rate_limit_events, 1);
        assert_eq!(search.stats().groups_failed, 0);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_stops_requests() {
        let provider = ScriptedSearch::new(vec![
            page(&["1"], Some("a")),
            page(&["2"], Some("b")),
        ]);
        let settings = SearchSettings {
            request_budget: 2,
            ..SearchSettings::default()
        };
        let mut search = orchestrator(&provider, settings);

        let posts = search.search_groups(&groups(), Utc::now()).await;
        assert_eq!(posts.len(), 2);
        assert_eq!(search.budget_remaining(), 0);

        let extra = search.search_ticker(&Ticker::new("FOO"), 10).await;
        assert!(extra.is_empty());
        assert_eq!(provider.calls().len(), 2);
        assert_eq!(search.stats().groups_skipped, 1);
    }

    #[tokio::test]
    async fn test_ticker_search_is_single_page() {
        let provider = ScriptedSearch::new(vec![page(&["1", "2"], Some("more"))]);
        let mut search = orchestrator(&provider, SearchSettings::default());

        let posts = search.search_ticker(&Ticker::new("foo"), 10).await;

        assert_eq!(posts.len(), 2);
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.query, "FOO -is:retweet lang:en");
        assert_eq!(calls[0].0.start_time, None);
        assert_eq!(calls[0].0.max_results, 10);
    }
}
