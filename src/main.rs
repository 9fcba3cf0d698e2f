use anyhow::{Context, Result};
use clap::Parser;
use llm_interface::ClaudeProvider;
use scan_service::ScanRun;
use scout_core::{
    ConfigError, ErrorExt, ReportMode, ScoutConfig, TWITTER_BEARER_TOKEN_VAR,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use twitter_client::TwitterApiClient;

const DEFAULT_LOG_FILTER: &str =
    "cashtag_scout=info,scan_service=info,twitter_client=info,llm_interface=info,database=info,scout_core=info";

/// Scan recent posts for cashtags mentioned alongside exchange names.
#[derive(Debug, Parser)]
#[command(name = "cashtag-scout", version, about)]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "cashtag-scout.toml")]
    config: PathBuf,

    /// Persist findings but do not call the analysis API
    #[arg(long)]
    skip_analysis: bool,

    /// first-sighting or every-post
    #[arg(long)]
    report_mode: Option<ReportMode>,
}

fn load_config(cli: &Cli) -> Result<ScoutConfig> {
    let mut config = ScoutConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_env();

    if cli.skip_analysis {
        config.analysis.enabled = false;
    }
    if let Some(mode) = cli.report_mode {
        config.novelty.report_mode = mode;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// The provider is built whenever a key is configured; the run itself decides
/// whether analysis is enabled.
fn build_analysis(config: &ScoutConfig) -> Result<Option<ClaudeProvider>> {
    let Some(api_key) = config.analysis.api_key.clone() else {
        return Ok(None);
    };

    let provider = ClaudeProvider::new(
        config.analysis.api_url.clone(),
        api_key,
        config.analysis.model.clone(),
        config.analysis.max_tokens,
        Duration::from_secs(config.analysis.timeout_secs),
    )?
    .with_retry_policy(config.analysis_retry_policy());
    Ok(Some(provider))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting cashtag scout");

    let config = load_config(&cli)?;
    let bearer_token = config.search.bearer_token.clone().ok_or_else(|| {
        ConfigError::MissingEnvironmentVariable {
            var_name: TWITTER_BEARER_TOKEN_VAR.to_string(),
        }
    })?;

    let search = TwitterApiClient::new(
        &config.search.api_base,
        bearer_token,
        Duration::from_secs(config.search.timeout_secs),
    )?;
    let analysis = build_analysis(&config)?;

    let run = ScanRun::new(config, search, analysis);
    match run.run().await {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!("Scan aborted: {}", e.user_friendly_message());
            Err(e.into())
        }
    }
}
