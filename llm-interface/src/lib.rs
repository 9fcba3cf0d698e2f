pub mod claude;
pub mod opinion;
pub mod prompt;

use scout_core::{CoreError, Ticker};

pub use claude::ClaudeProvider;
pub use opinion::interpret;

/// Bounded corpus handed to the analysis capability for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub ticker: Ticker,
    pub texts: Vec<String>,
    /// Union of exchanges seen alongside the ticker in this run.
    pub exchanges: Vec<String>,
}

pub trait LlmProvider {
    /// Returns the raw model text. Interpretation into an `Opinion` is left
    /// to [`opinion::interpret`] so that every failure mode maps to a
    /// fallback record instead of an error.
    async fn analyze_cashtag(&self, request: &AnalysisRequest) -> Result<String, CoreError>;
}
