use chrono::{DateTime, Duration, Utc};
use scout_core::{extract_tickers, ExchangeCatalog, Finding, HistoryRecord, Post, ReportMode, Ticker};
use tracing::debug;

/// Turns candidate posts into findings while recording sightings in the
/// history.
///
/// In `FirstSighting` mode history updates take effect immediately, so only
/// the first post (in processing order) that introduces a dormant ticker is
/// reported. In `EveryPost` mode novelty is judged against the history as it
/// stood before the pass, and every qualifying post is reported.
pub struct NoveltyFilter<'a> {
    catalog: &'a ExchangeCatalog,
    window: Duration,
    mode: ReportMode,
}

impl<'a> NoveltyFilter<'a> {
    pub fn new(catalog: &'a ExchangeCatalog, window: Duration, mode: ReportMode) -> Self {
        Self {
            catalog,
            window,
            mode,
        }
    }

    pub fn apply(
        &self,
        posts: &[Post],
        history: &mut HistoryRecord,
        now: DateTime<Utc>,
    ) -> Vec<Finding> {
        let baseline = match self.mode {
            ReportMode::EveryPost => Some(history.clone()),
            ReportMode::FirstSighting => None,
        };
        let mut findings = Vec::new();

        for post in posts {
            let raw_tickers = extract_tickers(&post.text);
            if raw_tickers.is_empty() {
                continue;
            }

            let exchanges = self.catalog.detect_mentions(&post.text);
            if exchanges.is_empty() {
                continue;
            }

            let mut tickers: Vec<Ticker> = Vec::with_capacity(raw_tickers.len());
            for raw in raw_tickers {
                let ticker = Ticker::new(raw);
                if !tickers.contains(&ticker) {
                    tickers.push(ticker);
                }
            }

            for ticker in tickers {
                let recently_seen = baseline
                    .as_ref()
                    .unwrap_or(&*history)
                    .is_recently_seen(&ticker, now, self.window);
                if recently_seen {
                    debug!("Skipping ${} from post {}: seen recently", ticker, post.id);
                    continue;
                }

                history.record_sighting(&ticker, exchanges.iter().cloned(), now);
                findings.push(Finding::from_post(ticker, post, exchanges.clone()));
            }
        }

        findings
    }
}
