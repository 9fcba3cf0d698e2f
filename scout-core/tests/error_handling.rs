use scout_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, LlmError, SearchApiError, StorageError,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let search_error = CoreError::SearchApi(SearchApiError::RequestTimeout);
    assert_eq!(search_error.error_code(), "SEARCH_TIMEOUT");

    let storage_error = CoreError::Storage(StorageError::CorruptStore {
        path: "cashtag_history.json".to_string(),
    });
    assert_eq!(storage_error.error_code(), "STORE_CORRUPT");

    let llm_error = CoreError::Llm(LlmError::InvalidApiKey {
        provider: "claude".to_string(),
    });
    assert_eq!(llm_error.error_code(), "LLM_INVALID_API_KEY");

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "TWITTER_BEARER_TOKEN".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG_MISSING_ENV_VAR");

    let budget = CoreError::BudgetExhausted { used: 25 };
    assert_eq!(budget.error_code(), "BUDGET_EXHAUSTED");
}

#[test]
fn test_rate_limit_is_distinguishable() {
    let limited = CoreError::SearchApi(SearchApiError::RateLimitExceeded { retry_after: 900 });
    assert!(limited.is_rate_limited());
    assert!(!limited.is_retryable());

    let server = CoreError::SearchApi(SearchApiError::ServerError { status_code: 500 });
    assert!(!server.is_rate_limited());
    assert!(server.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::SearchApi(SearchApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let llm_limit = CoreError::Llm(LlmError::RateLimitExceeded {
        provider: "claude".to_string(),
        retry_after: 30,
    });
    assert_eq!(llm_limit.retry_after(), Some(Duration::from_secs(30)));
    assert!(llm_limit.is_retryable());

    let timeout = CoreError::Llm(LlmError::RequestTimeout {
        provider: "claude".to_string(),
    });
    assert!(timeout.is_retryable());
    assert_eq!(timeout.retry_after(), None);

    let config_error = CoreError::Config(ConfigError::ValidationFailed {
        reason: "empty catalog".to_string(),
    });
    assert!(!config_error.is_retryable());
    assert_eq!(config_error.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let search_error = CoreError::SearchApi(SearchApiError::AuthenticationFailed {
        reason: "401".to_string(),
    });
    let message = search_error.user_friendly_message();
    assert!(message.contains("bearer token"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "TWITTER_BEARER_TOKEN".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("TWITTER_BEARER_TOKEN"));

    let budget = CoreError::BudgetExhausted { used: 25 };
    assert!(budget.user_friendly_message().contains("25 requests"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new("search");
    assert_eq!(reporter.component(), "search");
    let error = CoreError::SearchApi(SearchApiError::ServerError { status_code: 503 });

    // Only checks that reporting never panics
    reporter.report_error("search group 1", &error);
    reporter.report_warning("search group 1", &error);
}
