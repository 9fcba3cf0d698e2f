//! One batch pass: search, novelty filter, prioritization, analysis and
//! persistence.

pub mod collector;
pub mod novelty;
pub mod orchestrator;
pub mod prioritizer;
pub mod runner;

pub use collector::AnalysisCollector;
pub use novelty::NoveltyFilter;
pub use orchestrator::{lookback_start, SearchOrchestrator, SearchStats};
pub use prioritizer::{count_mentions, prioritize, TickerMentions};
pub use runner::{RunSummary, ScanRun};
