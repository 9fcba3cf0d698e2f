use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Search API error: {0}")]
    SearchApi(#[from] SearchApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Request budget exhausted after {used} requests")]
    BudgetExhausted { used: u32 },
}

impl CoreError {
    /// True for the search capability's rate-limit signal, which callers must
    /// handle with a cooldown rather than a retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            CoreError::SearchApi(SearchApiError::RateLimitExceeded { .. })
        )
    }
}

#[derive(Error, Debug, Clone)]
pub enum SearchApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Invalid search query: {query}")]
    InvalidQuery { query: String },

    #[error("API endpoint unavailable: {endpoint}")]
    EndpointUnavailable { endpoint: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

impl SearchApiError {
    pub fn code(&self) -> &'static str {
        match self {
            SearchApiError::AuthenticationFailed { .. } => "SEARCH_AUTH_FAILED",
            SearchApiError::RateLimitExceeded { .. } => "SEARCH_RATE_LIMIT",
            SearchApiError::Forbidden { .. } => "SEARCH_FORBIDDEN",
            SearchApiError::InvalidQuery { .. } => "SEARCH_INVALID_QUERY",
            SearchApiError::EndpointUnavailable { .. } => "SEARCH_ENDPOINT_UNAVAILABLE",
            SearchApiError::RequestTimeout => "SEARCH_TIMEOUT",
            SearchApiError::InvalidResponse { .. } => "SEARCH_INVALID_RESPONSE",
            SearchApiError::ServerError { .. } => "SEARCH_SERVER_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Corrupt store at {path}")]
    CorruptStore { path: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::ReadFailed { .. } => "STORE_READ_FAILED",
            StorageError::WriteFailed { .. } => "STORE_WRITE_FAILED",
            StorageError::CorruptStore { .. } => "STORE_CORRUPT",
            StorageError::Csv(_) => "STORE_CSV_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key invalid or missing for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Model not available: {model}")]
    ModelNotAvailable { model: String },

    #[error("Provider returned status {status_code}: {body}")]
    ApiStatus { status_code: u16, body: String },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("Invalid response format from {provider}")]
    InvalidResponseFormat { provider: String },
}

impl LlmError {
    pub fn code(&self) -> &'static str {
        match self {
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY",
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT",
            LlmError::ModelNotAvailable { .. } => "LLM_MODEL_NOT_AVAILABLE",
            LlmError::ApiStatus { .. } => "LLM_API_STATUS",
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT",
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not readable: {path}")]
    FileNotReadable { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::FileNotReadable { .. } => "CONFIG_FILE_NOT_READABLE",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }
}
