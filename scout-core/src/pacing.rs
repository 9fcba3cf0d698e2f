use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// The fixed waits a run makes: a cooldown after the search capability
/// signals a rate limit, and a pause between consecutive analysis calls.
/// Both block the run; nothing else proceeds while they elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    pub rate_limit_cooldown: Duration,
    pub analysis_pause: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            rate_limit_cooldown: Duration::from_secs(15 * 60),
            analysis_pause: Duration::from_secs(2),
        }
    }
}

impl WaitPolicy {
    /// Zero-duration waits, for tests.
    pub fn immediate() -> Self {
        Self {
            rate_limit_cooldown: Duration::ZERO,
            analysis_pause: Duration::ZERO,
        }
    }

    pub async fn rate_limit_cooldown(&self) {
        warn!(
            "Rate limit exceeded. Waiting for {} minutes...",
            self.rate_limit_cooldown.as_secs() / 60
        );
        sleep(self.rate_limit_cooldown).await;
    }

    pub async fn analysis_pause(&self) {
        if !self.analysis_pause.is_zero() {
            info!("  Pausing briefly between analyses...");
        }
        sleep(self.analysis_pause).await;
    }
}
