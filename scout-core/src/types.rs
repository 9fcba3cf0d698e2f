use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Recommendation used whenever an analysis could not be completed.
pub const FALLBACK_RECOMMENDATION: &str = "Investigate Further";

/// Uppercased cashtag symbol. Two tickers are the same iff their uppercased
/// text is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A post returned by the search capability. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<String>,
    pub like_count: u64,
    pub share_count: u64,
}

impl Post {
    pub fn permalink(&self) -> String {
        format!("https://twitter.com/user/status/{}", self.id)
    }
}

/// One (post, ticker) pair that passed every filter in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub ticker: Ticker,
    pub post_id: String,
    pub text: String,
    pub permalink: String,
    pub created_at: DateTime<Utc>,
    /// Never empty; catalog order.
    pub exchanges_mentioned: Vec<String>,
    pub likes: u64,
    pub retweets: u64,
}

impl Finding {
    pub fn from_post(ticker: Ticker, post: &Post, exchanges: Vec<String>) -> Self {
        Self {
            ticker,
            post_id: post.id.clone(),
            text: post.text.clone(),
            permalink: post.permalink(),
            created_at: post.created_at,
            exchanges_mentioned: exchanges,
            likes: post.like_count,
            retweets: post.share_count,
        }
    }

    pub fn exchanges_joined(&self) -> String {
        self.exchanges_mentioned.join(", ")
    }
}

/// Structured opinion returned by the analysis capability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Opinion {
    pub likely_new_listing: Option<bool>,
    pub sentiment_score: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub red_flags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub listing_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recommendation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub brief_summary: String,
}

/// Explicit `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Flat per-ticker analysis row. Appended once per analyzed ticker per run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub ticker: Ticker,
    pub exchanges: String,
    pub tweet_count: usize,
    pub analysis_time: DateTime<Utc>,
    pub mention_count: usize,
    pub likely_new_listing: Option<bool>,
    pub sentiment_score: Option<f64>,
    pub key_points: String,
    pub red_flags: String,
    pub listing_status: String,
    pub recommendation: String,
    pub brief_summary: String,
}

impl AnalysisRecord {
    /// Flattens an opinion for tabular storage: list fields become a bulleted,
    /// newline-joined string.
    pub fn from_opinion(
        ticker: Ticker,
        exchanges: String,
        tweet_count: usize,
        mention_count: usize,
        analysis_time: DateTime<Utc>,
        opinion: Opinion,
    ) -> Self {
        Self {
            ticker,
            exchanges,
            tweet_count,
            analysis_time,
            mention_count,
            likely_new_listing: opinion.likely_new_listing,
            sentiment_score: opinion.sentiment_score,
            key_points: bulleted(&opinion.key_points),
            red_flags: bulleted(&opinion.red_flags),
            listing_status: opinion.listing_status,
            recommendation: opinion.recommendation,
            brief_summary: opinion.brief_summary,
        }
    }
}

pub fn bulleted(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    format!("• {}", items.join("\n• "))
}
