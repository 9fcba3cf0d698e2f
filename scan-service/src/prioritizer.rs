use scout_core::{Finding, Ticker, MAX_PRIORITIZED_TICKERS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerMentions {
    pub ticker: Ticker,
    pub mention_count: usize,
}

/// Findings per ticker, in order of first discovery.
pub fn count_mentions(findings: &[Finding]) -> Vec<TickerMentions> {
    let mut counts: Vec<TickerMentions> = Vec::new();
    for finding in findings {
        match counts.iter_mut().find(|entry| entry.ticker == finding.ticker) {
            Some(entry) => entry.mention_count += 1,
            None => counts.push(TickerMentions {
                ticker: finding.ticker.clone(),
                mention_count: 1,
            }),
        }
    }
    counts
}

/// Most-mentioned tickers first, discovery order breaking ties. Never more
/// than `MAX_PRIORITIZED_TICKERS`, whatever `limit` asks for.
pub fn prioritize(findings: &[Finding], limit: usize) -> Vec<TickerMentions> {
    let mut counts = count_mentions(findings);
    counts.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
    counts.truncate(limit.min(MAX_PRIORITIZED_TICKERS));
    counts
}
