//! In-memory cashtag history: which tickers have been reported, when, and
//! alongside which exchanges.

use crate::types::Ticker;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Drives the lookback window of the next run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default, with = "crate::timestamp::option")]
    pub last_check: Option<DateTime<Utc>>,
}

impl RunState {
    /// Advances `last_check` to `now`; never moves it backwards.
    pub fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.last_check = Some(match self.last_check {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    pub fn is_first_run(&self) -> bool {
        self.last_check.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenTicker {
    #[serde(with = "crate::timestamp")]
    pub last_seen: DateTime<Utc>,
    /// Cumulative union of every exchange ever seen with the ticker.
    #[serde(default)]
    pub exchanges: BTreeSet<String>,
}

/// A ticker absent from the record has never passed the novelty filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryRecord {
    seen: BTreeMap<Ticker, SeenTicker>,
}

impl HistoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticker: &Ticker) -> Option<&SeenTicker> {
        self.seen.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, &SeenTicker)> {
        self.seen.iter()
    }

    /// True iff the ticker was seen less than `window` before `now`.
    pub fn is_recently_seen(&self, ticker: &Ticker, now: DateTime<Utc>, window: Duration) -> bool {
        match self.seen.get(ticker) {
            Some(entry) => now - entry.last_seen < window,
            None => false,
        }
    }

    /// Sets `last_seen = now` and unions `exchanges` into the stored set,
    /// creating the entry if absent.
    pub fn record_sighting<I, S>(&mut self, ticker: &Ticker, exchanges: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.seen.entry(ticker.clone()).or_insert_with(|| SeenTicker {
            last_seen: now,
            exchanges: BTreeSet::new(),
        });
        entry.last_seen = now;
        entry.exchanges.extend(exchanges.into_iter().map(Into::into));
    }
}
