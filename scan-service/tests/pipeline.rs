use chrono::{DateTime, Duration, TimeZone, Utc};
use database::table::read_table;
use database::HistoryStore;
use llm_interface::{AnalysisRequest, LlmProvider};
use scan_service::ScanRun;
use scout_core::{
    CoreError, HistoryRecord, Post, ReportMode, RunState, ScoutConfig, SearchApiError, Ticker,
    FALLBACK_RECOMMENDATION,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;
use twitter_client::{SearchPage, SearchProvider, SearchRequest};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 13, 12, 0, 0).unwrap()
}

fn post(id: &str, text: &str) -> Post {
    Post {
        id: id.to_string(),
        text: text.to_string(),
        created_at: now() - Duration::hours(1),
        author: Some("watcher".to_string()),
        like_count: 3,
        share_count: 1,
    }
}

/// Serves posts per query; any query it does not know returns nothing.
#[derive(Default)]
struct MockSearch {
    by_query: HashMap<String, Vec<Post>>,
    rate_limited_queries: Vec<String>,
    reject_credentials: bool,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockSearch {
    fn with_group_posts(posts: Vec<Post>) -> Self {
        let mut by_query = HashMap::new();
        by_query.insert(
            r#"("coinbase" OR "binance") -is:retweet"#.to_string(),
            posts,
        );
        Self {
            by_query,
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SearchProvider for MockSearch {
    async fn search_page(
        &self,
        request: &SearchRequest,
        _next_token: Option<&str>,
    ) -> Result<SearchPage, CoreError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.rate_limited_queries.contains(&request.query) {
            return Err(CoreError::SearchApi(SearchApiError::RateLimitExceeded {
                retry_after: 900,
            }));
        }
        Ok(SearchPage {
            posts: self.by_query.get(&request.query).cloned().unwrap_or_default(),
            next_token: None,
        })
    }

    async fn check_connectivity(&self) -> Result<(), CoreError> {
        if self.reject_credentials {
            return Err(CoreError::SearchApi(SearchApiError::AuthenticationFailed {
                reason: "bearer token rejected".to_string(),
            }));
        }
        Ok(())
    }
}

struct MockLlm {
    reply: String,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl MockLlm {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for MockLlm {
    async fn analyze_cashtag(&self, request: &AnalysisRequest) -> Result<String, CoreError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

fn config(dir: &TempDir) -> ScoutConfig {
    let mut config = ScoutConfig::default();
    config.exchanges.catalog = vec![
        "coinbase".to_string(),
        "binance".to_string(),
        "kraken".to_string(),
    ];
    config.exchanges.groups = vec![
        vec!["coinbase".to_string(), "binance".to_string()],
        vec!["kraken".to_string()],
    ];
    config.analysis.api_key = Some("test-key".to_string());
    config.search.rate_limit_cooldown_secs = 0;
    config.analysis.pause_secs = 0;
    config.storage.history_path = dir.path().join("cashtag_history.json");
    config.storage.findings_path = dir.path().join("new_listings.csv");
    config.storage.analysis_path = dir.path().join("ai_analysis.csv");
    config
}

async fn seed_history(config: &ScoutConfig, ticker: &str, last_seen: DateTime<Utc>) {
    let mut history = HistoryRecord::new();
    history.record_sighting(&Ticker::new(ticker), ["kraken"], last_seen);
    HistoryStore::new(config.storage.history_path.clone())
        .save(
            &RunState {
                last_check: Some(last_seen),
            },
            &history,
        )
        .await
        .unwrap();
}

const MOON_POST: &str = "¥ $FOO to the moon, listing on coinbase soon!";

#[tokio::test]
async fn test_new_ticker_produces_one_finding_and_history_entry() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let search = MockSearch::with_group_posts(vec![post("1", MOON_POST)]);
    let run = ScanRun::new(config.clone(), search, None::<MockLlm>);

    let summary = run.run_at(now()).await.unwrap();

    assert_eq!(summary.findings.len(), 1);
    let finding = &summary.findings[0];
    assert_eq!(finding.ticker, Ticker::new("FOO"));
    assert_eq!(finding.exchanges_joined(), "coinbase");

    let (run_state, history) = HistoryStore::new(config.storage.history_path.clone())
        .load()
        .await;
    assert_eq!(run_state.last_check, Some(now()));
    let seen = history.get(&Ticker::new("FOO")).unwrap();
    assert_eq!(seen.last_seen, now());
    assert_eq!(seen.exchanges.iter().collect::<Vec<_>>(), vec!["coinbase"]);

    let table = read_table(&config.storage.findings_path).await.unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.value(0, "tweet_id"), Some("1"));
    assert_eq!(table.value(0, "exchanges_mentioned"), Some("coinbase"));
}

#[tokio::test]
async fn test_recently_seen_ticker_is_suppressed() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let one_day_ago = now() - Duration::days(1);
    seed_history(&config, "FOO", one_day_ago).await;
    let search = MockSearch::with_group_posts(vec![post("1", MOON_POST), post("2", MOON_POST)]);
    let run = ScanRun::new(config.clone(), search, None::<MockLlm>);

    let summary = run.run_at(now()).await.unwrap();

    assert!(summary.findings.is_empty());
    let (_, history) = HistoryStore::new(config.storage.history_path.clone())
        .load()
        .await;
    let seen = history.get(&Ticker::new("FOO")).unwrap();
    assert_eq!(seen.last_seen, one_day_ago);
    assert_eq!(seen.exchanges.iter().collect::<Vec<_>>(), vec!["kraken"]);
    assert!(!config.storage.findings_path.exists());
}

#[tokio::test]
async fn test_dormant_ticker_is_reported_again() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    seed_history(&config, "FOO", now() - Duration::days(10)).await;
    let search = MockSearch::with_group_posts(vec![post("1", MOON_POST)]);
    let run = ScanRun::new(config.clone(), search, None::<MockLlm>);

    let summary = run.run_at(now()).await.unwrap();

    assert_eq!(summary.findings.len(), 1);
    let (_, history) = HistoryStore::new(config.storage.history_path.clone())
        .load()
        .await;
    let seen = history.get(&Ticker::new("FOO")).unwrap();
    assert_eq!(seen.last_seen, now());
    assert!(seen.exchanges.contains("kraken"));
    assert!(seen.exchanges.contains("coinbase"));
}

#[tokio::test]
async fn test_lookback_depends_on_prior_run() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let run = ScanRun::new(config.clone(), MockSearch::default(), None::<MockLlm>);

    run.run_at(now()).await.unwrap();
    run.run_at(now() + Duration::hours(1)).await.unwrap();

    let requests = run.search().requests();
    assert_eq!(requests[0].start_time, Some(now() - Duration::hours(12)));
    assert_eq!(
        requests.last().unwrap().start_time,
        Some(now() + Duration::hours(1) - Duration::hours(6))
    );
}

#[tokio::test]
async fn test_duplicate_posts_across_groups_count_once() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.novelty.report_mode = ReportMode::EveryPost;
    let shared = post("1", "$BAR listed on coinbase and kraken");
    let mut search = MockSearch::with_group_posts(vec![shared.clone()]);
    search
        .by_query
        .insert(r#"("kraken") -is:retweet"#.to_string(), vec![shared]);
    let run = ScanRun::new(config, search, None::<MockLlm>);

    let summary = run.run_at(now()).await.unwrap();

    assert_eq!(summary.findings.len(), 1);
    assert_eq!(summary.search.duplicate_posts, 1);
}

#[tokio::test]
async fn test_rate_limited_group_does_not_abort_run() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let mut search = MockSearch::default();
    search
        .rate_limited_queries
        .push(r#"("coinbase" OR "binance") -is:retweet"#.to_string());
    search.by_query.insert(
        r#"("kraken") -is:retweet"#.to_string(),
        vec![post("9", "$BAZ trading on kraken")],
    );
    let run = ScanRun::new(config, search, None::<MockLlm>);

    let summary = run.run_at(now()).await.unwrap();

    assert_eq!(summary.search.rate_limit_events, 1);
    assert_eq!(summary.findings.len(), 1);
    assert_eq!(summary.findings[0].ticker, Ticker::new("BAZ"));
}

#[tokio::test]
async fn test_rejected_credentials_are_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let search = MockSearch {
        reject_credentials: true,
        ..MockSearch::default()
    };
    let run = ScanRun::new(config.clone(), search, None::<MockLlm>);

    let result = run.run_at(now()).await;

    assert!(result.is_err());
    assert!(!config.storage.history_path.exists());
}

#[tokio::test]
async fn test_analysis_uses_supplemental_search_and_bounds_texts() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let long_text = format!("$FOO on binance {}", "a".repeat(800));
    let mut search = MockSearch::with_group_posts(vec![post("1", &long_text)]);
    search.by_query.insert(
        "FOO -is:retweet lang:en".to_string(),
        (0..20).map(|i| post(&format!("s{}", i), &"b".repeat(700))).collect(),
    );
    let llm = MockLlm::replying(
        "```json\n{\"likely_new_listing\": true, \"sentiment_score\": 4, \
         \"key_points\": [\"Listing\"], \"red_flags\": [], \"listing_status\": \"confirmed\", \
         \"recommendation\": \"High Interest\", \"brief_summary\": \"Real listing.\"}\n```",
    );
    let run = ScanRun::new(config.clone(), search, Some(llm));

    let summary = run.run_at(now()).await.unwrap();

    let requests = run.llm().unwrap().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].texts.len(), 15);
    assert!(requests[0].texts.iter().all(|t| t.chars().count() <= 500));
    assert_eq!(requests[0].exchanges, vec!["binance"]);

    assert_eq!(summary.analyses.len(), 1);
    let record = &summary.analyses[0];
    assert_eq!(record.recommendation, "High Interest");
    assert_eq!(record.key_points, "• Listing");
    assert_eq!(record.tweet_count, 15);
    assert_eq!(record.mention_count, 1);

    let table = read_table(&config.storage.analysis_path).await.unwrap();
    assert_eq!(table.value(0, "ticker"), Some("FOO"));
    assert_eq!(table.value(0, "listing_status"), Some("confirmed"));
}

#[tokio::test]
async fn test_enough_findings_skip_supplemental_search() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.novelty.report_mode = ReportMode::EveryPost;
    let posts = (0..6)
        .map(|i| post(&i.to_string(), "$MANY launching on coinbase"))
        .collect();
    let search = MockSearch::with_group_posts(posts);
    let llm = MockLlm::replying("not json at all");
    let run = ScanRun::new(config, search, Some(llm));

    let summary = run.run_at(now()).await.unwrap();

    assert!(run
        .search()
        .requests()
        .iter()
        .all(|request| !request.query.contains("lang:en")));
    assert_eq!(run.llm().unwrap().requests()[0].texts.len(), 6);
    let record = &summary.analyses[0];
    assert_eq!(record.recommendation, FALLBACK_RECOMMENDATION);
    assert!(!record.red_flags.is_empty());
    assert_eq!(record.mention_count, 6);
}

#[tokio::test]
async fn test_too_few_texts_skip_analysis() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let search = MockSearch::with_group_posts(vec![post("1", MOON_POST)]);
    let llm = MockLlm::replying("{}");
    let run = ScanRun::new(config.clone(), search, Some(llm));

    let summary = run.run_at(now()).await.unwrap();

    assert_eq!(summary.findings.len(), 1);
    assert!(summary.analyses.is_empty());
    assert!(run.llm().unwrap().requests().is_empty());
    assert!(!config.storage.analysis_path.exists());
}

#[tokio::test]
async fn test_disabled_analysis_is_reported_as_disabled() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.analysis.enabled = false;
    let posts = (0..6)
        .map(|i| post(&i.to_string(), "$MANY launching on coinbase"))
        .collect::<Vec<_>>();

    let run = ScanRun::new(
        config.clone(),
        MockSearch::with_group_posts(posts.clone()),
        Some(MockLlm::replying("{}")),
    );
    assert_eq!(run.analysis_skip_reason(), Some("disabled for this run"));
    let summary = run.run_at(now()).await.unwrap();
    assert_eq!(summary.findings.len(), 1);
    assert!(summary.analyses.is_empty());
    assert!(run.llm().unwrap().requests().is_empty());

    let keyless = ScanRun::new(config, MockSearch::with_group_posts(posts), None::<MockLlm>);
    assert_eq!(keyless.analysis_skip_reason(), Some("disabled for this run"));
}

#[tokio::test]
async fn test_missing_provider_is_reported_as_missing_key() {
    let dir = TempDir::new().unwrap();
    let run = ScanRun::new(
        config(&dir),
        MockSearch::with_group_posts(Vec::new()),
        None::<MockLlm>,
    );

    assert_eq!(run.analysis_skip_reason(), Some("API key not configured"));
}
