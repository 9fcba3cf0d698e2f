use crate::prompt::build_prompt;
use crate::{AnalysisRequest, LlmProvider};
use reqwest::{Client, StatusCode};
use scout_core::{CoreError, LlmError, RetryExecutor, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const PROVIDER: &str = "claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl MessagesResponse {
    /// Text of the first content block, empty when there is none.
    pub fn first_text(self) -> String {
        self.content
            .into_iter()
            .next()
            .map(|block| block.text)
            .unwrap_or_default()
    }
}

/// Maps a non-success Messages API status to an `LlmError`.
pub fn status_error(status: StatusCode, retry_after: Option<u64>, body: String, model: &str) -> LlmError {
    match status.as_u16() {
        401 => LlmError::InvalidApiKey {
            provider: PROVIDER.to_string(),
        },
        404 => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        429 => LlmError::RateLimitExceeded {
            provider: PROVIDER.to_string(),
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        code => LlmError::ApiStatus {
            status_code: code,
            body,
        },
    }
}

/// Anthropic Messages API client.
#[derive(Debug)]
pub struct ClaudeProvider {
    http_client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryExecutor,
}

impl ClaudeProvider {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_url,
            api_key,
            model,
            max_tokens,
            retry: RetryExecutor::new(RetryPolicy::analysis()),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String, CoreError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            error!("Claude API returned {} for model {}", status, self.model);
            return Err(CoreError::Llm(status_error(status, retry_after, text, &self.model)));
        }

        let payload: MessagesResponse = response.json().await.map_err(|e| {
            error!("Failed to decode Claude response: {}", e);
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            })
        })?;
        Ok(payload.first_text())
    }
}

impl LlmProvider for ClaudeProvider {
    async fn analyze_cashtag(&self, request: &AnalysisRequest) -> Result<String, CoreError> {
        let prompt = build_prompt(request);
        debug!(
            "Sending {} texts for ${} to {}",
            request.texts.len(),
            request.ticker,
            self.model
        );

        let text = self
            .retry
            .execute(&format!("analyze ${}", request.ticker), || self.send_prompt(&prompt))
            .await?;
        info!("Received analysis for ${}", request.ticker);
        Ok(text)
    }
}
