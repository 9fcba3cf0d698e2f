use crate::orchestrator::SearchOrchestrator;
use crate::prioritizer::TickerMentions;
use chrono::Utc;
use llm_interface::{interpret, AnalysisRequest, LlmProvider};
use scout_core::{AnalysisRecord, AnalysisSettings, Finding, WaitPolicy};
use std::collections::BTreeSet;
use tracing::info;
use twitter_client::SearchProvider;

/// At most `max_texts` texts, each cut to `max_chars` characters.
pub fn bound_texts(texts: Vec<String>, max_texts: usize, max_chars: usize) -> Vec<String> {
    texts
        .into_iter()
        .take(max_texts)
        .map(|text| match text.char_indices().nth(max_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        })
        .collect()
}

/// Gathers a bounded corpus per prioritized ticker and asks the analysis
/// capability for an opinion on it.
pub struct AnalysisCollector<'a, L> {
    llm: &'a L,
    settings: &'a AnalysisSettings,
    wait: &'a WaitPolicy,
}

impl<'a, L: LlmProvider> AnalysisCollector<'a, L> {
    pub fn new(llm: &'a L, settings: &'a AnalysisSettings, wait: &'a WaitPolicy) -> Self {
        Self {
            llm,
            settings,
            wait,
        }
    }

    /// Analyzes each ticker in priority order. Tickers with too little text
    /// are skipped; analysis failures become fallback records.
    pub async fn collect<S: SearchProvider>(
        &self,
        prioritized: &[TickerMentions],
        findings: &[Finding],
        search: &mut SearchOrchestrator<'_, S>,
    ) -> Vec<AnalysisRecord> {
        let mut records = Vec::new();

        for (index, entry) in prioritized.iter().enumerate() {
            let ticker = &entry.ticker;
            info!(
                "Analyzing ${} (mentioned {} times)...",
                ticker, entry.mention_count
            );

            let ticker_findings: Vec<&Finding> = findings
                .iter()
                .filter(|finding| &finding.ticker == ticker)
                .collect();
            let exchanges: BTreeSet<String> = ticker_findings
                .iter()
                .flat_map(|finding| finding.exchanges_mentioned.iter().cloned())
                .collect();
            let mut texts: Vec<String> = ticker_findings
                .iter()
                .map(|finding| finding.text.clone())
                .collect();

            if ticker_findings.len() >= self.settings.reuse_threshold {
                info!(
                    "  Using {} existing tweets (saving API requests)",
                    ticker_findings.len()
                );
            } else {
                info!(
                    "  Collecting up to {} additional tweets...",
                    self.settings.supplemental_max_results
                );
                let extra = search
                    .search_ticker(ticker, self.settings.supplemental_max_results)
                    .await;
                texts.extend(extra.into_iter().map(|post| post.text));
            }

            if texts.len() < self.settings.min_texts {
                info!(
                    "  Not enough tweets collected for ${} analysis ({} found)",
                    ticker,
                    texts.len()
                );
                continue;
            }

            let request = AnalysisRequest {
                ticker: ticker.clone(),
                texts: bound_texts(
                    texts,
                    self.settings.max_texts,
                    self.settings.max_chars_per_text,
                ),
                exchanges: exchanges.iter().cloned().collect(),
            };
            let opinion = interpret(self.llm.analyze_cashtag(&request).await);
            let record = AnalysisRecord::from_opinion(
                ticker.clone(),
                request.exchanges.join(", "),
                request.texts.len(),
                entry.mention_count,
                Utc::now(),
                opinion,
            );

            info!("  Analysis complete:");
            info!(
                "    - Sentiment: {}",
                record
                    .sentiment_score
                    .map(|score| score.to_string())
                    .unwrap_or_else(|| "N/A".to_string())
            );
            info!("    - Recommendation: {}", record.recommendation);
            records.push(record);

            if index + 1 < prioritized.len() {
                self.wait.analysis_pause().await;
            }
        }

        records
    }
}
