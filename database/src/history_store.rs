use crate::replace_file;
use chrono::{DateTime, Utc};
use scout_core::{CoreError, ErrorExt, HistoryRecord, RunState, StorageError};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct StoredHistory {
    #[serde(default, with = "scout_core::timestamp::option")]
    last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    seen_cashtags: HistoryRecord,
}

#[derive(Debug, Serialize)]
struct StoredHistoryRef<'a> {
    #[serde(with = "scout_core::timestamp::option")]
    last_check: Option<DateTime<Utc>>,
    seen_cashtags: &'a HistoryRecord,
}

/// JSON file holding `{last_check, seen_cashtags}`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable history is an empty history, never an error.
    pub async fn load(&self) -> (RunState, HistoryRecord) {
        let shown = self.path.display().to_string();
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history at {}, starting fresh", shown);
                return Default::default();
            }
            Err(e) => {
                CoreError::Storage(StorageError::ReadFailed {
                    path: shown,
                    reason: e.to_string(),
                })
                .log_warn();
                return Default::default();
            }
        };

        match serde_json::from_str::<StoredHistory>(&content) {
            Ok(stored) => {
                info!(
                    "Loaded history with {} previously seen cashtags",
                    stored.seen_cashtags.len()
                );
                (
                    RunState {
                        last_check: stored.last_check,
                    },
                    stored.seen_cashtags,
                )
            }
            Err(e) => {
                debug!("History parse error: {}", e);
                CoreError::Storage(StorageError::CorruptStore { path: shown }).log_warn();
                Default::default()
            }
        }
    }

    pub async fn save(&self, run_state: &RunState, history: &HistoryRecord) -> Result<(), CoreError> {
        let stored = StoredHistoryRef {
            last_check: run_state.last_check,
            seen_cashtags: history,
        };
        let contents = serde_json::to_vec_pretty(&stored)?;
        replace_file(&self.path, &contents).await?;
        debug!(
            "Saved history with {} cashtags to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }
}
