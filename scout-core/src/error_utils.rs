use crate::error::*;
use crate::retry::{get_retry_strategy, RetryStrategy};
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    /// Wait the remote side asked for, if it named one.
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "{}", self);
        if let CoreError::Network(e) = self {
            error!("Network error details: {:?}", e);
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        get_retry_strategy(self) != RetryStrategy::NoRetry
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::SearchApi(SearchApiError::RateLimitExceeded { retry_after })
            | CoreError::Llm(LlmError::RateLimitExceeded { retry_after, .. }) => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::SearchApi(e) => search_message(e),
            CoreError::Storage(e) => storage_message(e),
            CoreError::Llm(e) => llm_message(e),
            CoreError::Config(e) => config_message(e),
            CoreError::Io(_) | CoreError::Serialization(_) => {
                "A local file could not be written. Check disk space and permissions.".to_string()
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}.", message),
            CoreError::BudgetExhausted { used } => format!(
                "Search request budget for this run is used up ({} requests).",
                used
            ),
        }
    }

    fn error_code(&self) -> String {
        let code = match self {
            CoreError::SearchApi(e) => e.code(),
            CoreError::Storage(e) => e.code(),
            CoreError::Llm(e) => e.code(),
            CoreError::Config(e) => e.code(),
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::BudgetExhausted { .. } => "BUDGET_EXHAUSTED",
        };
        code.to_string()
    }
}

fn search_message(error: &SearchApiError) -> String {
    match error {
        SearchApiError::AuthenticationFailed { .. } => {
            "Search API authentication failed. Please check your bearer token.".to_string()
        }
        SearchApiError::RateLimitExceeded { retry_after } => format!(
            "Search rate limit reached. The API asked to wait {} seconds.",
            retry_after
        ),
        SearchApiError::Forbidden { resource } => format!(
            "Access denied to {}. Your API tier may not include this endpoint.",
            resource
        ),
        SearchApiError::InvalidQuery { query } => {
            format!("The search query '{}' was rejected.", query)
        }
        SearchApiError::RequestTimeout => "The search API did not answer in time.".to_string(),
        _ => "The search API returned an error. Please try again later.".to_string(),
    }
}

fn storage_message(error: &StorageError) -> String {
    match error {
        StorageError::ReadFailed { path, .. } => format!("Could not read {}.", path),
        StorageError::WriteFailed { path, .. } => {
            format!("Could not write {}. Check disk space and permissions.", path)
        }
        StorageError::CorruptStore { path } => {
            format!("{} appears to be corrupted and was ignored.", path)
        }
        StorageError::Csv(_) => "A result table could not be parsed.".to_string(),
    }
}

fn llm_message(error: &LlmError) -> String {
    match error {
        LlmError::InvalidApiKey { provider } => {
            format!("The {} API key was rejected. Check CLAUDE_API_KEY.", provider)
        }
        LlmError::RateLimitExceeded {
            provider,
            retry_after,
        } => format!(
            "{} is rate limiting requests. It asked to wait {} seconds.",
            provider, retry_after
        ),
        LlmError::ModelNotAvailable { model } => {
            format!("Model '{}' is not available. Set CLAUDE_MODEL to another one.", model)
        }
        _ => "The analysis service returned an error. Please try again later.".to_string(),
    }
}

fn config_message(error: &ConfigError) -> String {
    match error {
        ConfigError::FileNotReadable { path } => {
            format!("Configuration file '{}' could not be read.", path)
        }
        ConfigError::InvalidValue { field, .. } => {
            format!("Invalid value for configuration field '{}'.", field)
        }
        ConfigError::MissingEnvironmentVariable { var_name } => format!(
            "Environment variable '{}' is required but not set.",
            var_name
        ),
        ConfigError::ValidationFailed { reason } => format!("Invalid configuration: {}.", reason),
        ConfigError::Parse(_) => "The configuration file is not valid TOML.".to_string(),
    }
}

/// Logs recovered failures, tagged with the pipeline stage they came from.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    component: &'static str,
}

impl ErrorReporter {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// `context` names what was being done: the group, ticker or store path.
    pub fn report_error(&self, context: &str, error: &CoreError) {
        error!(component = self.component, "{} failed", context);
        error.log_error();
        info!("{}", error.user_friendly_message());
        if let Some(wait) = error.retry_after() {
            info!("Remote side asked to wait {:?}", wait);
        }
    }

    pub fn report_warning(&self, context: &str, error: &CoreError) {
        warn!(
            component = self.component,
            code = %error.error_code(),
            "{}: {}",
            context,
            error
        );
    }
}
