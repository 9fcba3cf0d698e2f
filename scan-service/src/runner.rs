use crate::collector::AnalysisCollector;
use crate::novelty::NoveltyFilter;
use crate::orchestrator::{lookback_start, SearchOrchestrator, SearchStats};
use crate::prioritizer::{count_mentions, prioritize};
use chrono::{DateTime, Utc};
use database::{HistoryStore, ResultSink};
use llm_interface::LlmProvider;
use scout_core::{
    AnalysisRecord, CoreError, ErrorReporter, Finding, ScoutConfig, SearchApiError,
};
use tracing::{info, info_span, warn, Instrument};
use twitter_client::SearchProvider;
use uuid::Uuid;

const SKIP_DISABLED: &str = "disabled for this run";
const SKIP_NO_API_KEY: &str = "API key not configured";

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub posts_collected: usize,
    pub findings: Vec<Finding>,
    pub novel_tickers: usize,
    pub analyses: Vec<AnalysisRecord>,
    pub search: SearchStats,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "Run summary: {} posts, {} findings, {} new cashtags, {} analyses",
            self.posts_collected,
            self.findings.len(),
            self.novel_tickers,
            self.analyses.len()
        );
        if self.search.groups_failed > 0 || self.search.rate_limit_events > 0 {
            warn!(
                "{} search groups failed, {} rate limit events",
                self.search.groups_failed, self.search.rate_limit_events
            );
        }
        info!("Estimated API requests used: {}", self.search.requests_used);
    }
}

/// One batch pass over the search capability. The analysis capability is
/// optional; without it the run stops after persisting findings.
pub struct ScanRun<S, L> {
    config: ScoutConfig,
    search: S,
    llm: Option<L>,
    history: HistoryStore,
    sink: ResultSink,
    reporter: ErrorReporter,
}

impl<S: SearchProvider, L: LlmProvider> ScanRun<S, L> {
    pub fn new(config: ScoutConfig, search: S, llm: Option<L>) -> Self {
        let history = HistoryStore::new(config.storage.history_path.clone());
        let sink = ResultSink::new(
            config.storage.findings_path.clone(),
            config.storage.analysis_path.clone(),
        );
        Self {
            config,
            search,
            llm,
            history,
            sink,
            reporter: ErrorReporter::new("scan"),
        }
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    pub fn llm(&self) -> Option<&L> {
        self.llm.as_ref()
    }

    /// Why this run will not analyze its findings, if it will not.
    pub fn analysis_skip_reason(&self) -> Option<&'static str> {
        if !self.config.analysis.enabled {
            Some(SKIP_DISABLED)
        } else if self.llm.is_none() {
            Some(SKIP_NO_API_KEY)
        } else {
            None
        }
    }

    pub async fn run(&self) -> Result<RunSummary, CoreError> {
        self.run_at(Utc::now()).await
    }

    /// Runs with `now` as the reference time for the lookback window, the
    /// novelty check and the recorded sightings.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary, CoreError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("scan_run", run_id = %run_id);
        self.execute(run_id, now).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, now: DateTime<Utc>) -> Result<RunSummary, CoreError> {
        info!("Starting cashtag scan");
        self.check_connectivity().await?;

        let (mut run_state, mut history) = self.history.load().await;
        let start_time = lookback_start(&run_state, now, &self.config.search);
        info!("Searching posts since {}", start_time.to_rfc3339());

        let catalog = self.config.exchange_catalog();
        let wait = self.config.wait_policy();
        let mut search = SearchOrchestrator::new(
            &self.search,
            self.config.search.clone(),
            wait.clone(),
            self.config.search_retry_policy(),
        );
        let posts = search.search_groups(catalog.groups(), start_time).await;

        let filter = NoveltyFilter::new(
            &catalog,
            self.config.novelty.window(),
            self.config.novelty.report_mode,
        );
        let findings = filter.apply(&posts, &mut history, now);

        run_state.mark_checked(now);
        if let Err(e) = self.history.save(&run_state, &history).await {
            self.reporter.report_error("saving cashtag history", &e);
        }

        let mentions = count_mentions(&findings);
        let mut analyses = Vec::new();

        if findings.is_empty() {
            info!("No new cashtags found");
        } else {
            if let Err(e) = self.sink.append_findings(&findings).await {
                self.reporter.report_error("saving findings", &e);
            }
            info!(
                "Found {} new cashtags with exchange mentions",
                findings.len()
            );
            for finding in &findings {
                info!(
                    "${} - Mentioned with: {}",
                    finding.ticker,
                    finding.exchanges_joined()
                );
            }

            match (self.analysis_skip_reason(), &self.llm) {
                (None, Some(llm)) => {
                    let prioritized = prioritize(&findings, self.config.analysis.top_n);
                    info!(
                        "Performing AI analysis on top {} cashtags (of {} total)...",
                        prioritized.len(),
                        mentions.len()
                    );
                    let collector = AnalysisCollector::new(llm, &self.config.analysis, &wait);
                    analyses = collector.collect(&prioritized, &findings, &mut search).await;

                    if let Err(e) = self.sink.append_analyses(&analyses).await {
                        self.reporter.report_error("saving analyses", &e);
                    }
                }
                (reason, _) => info!(
                    "AI analysis skipped: {}",
                    reason.unwrap_or(SKIP_NO_API_KEY)
                ),
            }
        }

        let summary = RunSummary {
            run_id,
            started_at: now,
            posts_collected: posts.len(),
            novel_tickers: mentions.len(),
            findings,
            analyses,
            search: search.stats(),
        };
        summary.log();
        Ok(summary)
    }

    /// A rejected credential is fatal; any other probe failure is reported
    /// and the run goes ahead.
    async fn check_connectivity(&self) -> Result<(), CoreError> {
        match self.search.check_connectivity().await {
            Ok(()) => Ok(()),
            Err(e @ CoreError::SearchApi(SearchApiError::AuthenticationFailed { .. })) => {
                self.reporter.report_error("search API connectivity check", &e);
                Err(e)
            }
            Err(e) => {
                self.reporter.report_error("search API connectivity check", &e);
                warn!("Basic API connection test failed; continuing with the scan");
                Ok(())
            }
        }
    }
}
