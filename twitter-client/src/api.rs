use crate::{SearchPage, SearchProvider, SearchRequest};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use scout_core::{CoreError, Post, SearchApiError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<TweetData>,
    pub includes: Option<Includes>,
    pub meta: Option<SearchMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author_id: Option<String>,
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<UserData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMeta {
    pub result_count: Option<u32>,
    pub next_token: Option<String>,
}

impl SearchResponse {
    /// Converts the payload into posts. Authors are resolved to usernames
    /// through the `includes.users` expansion when present.
    pub fn into_page(self, fetched_at: DateTime<Utc>) -> SearchPage {
        let usernames: HashMap<String, String> = self
            .includes
            .map(|includes| {
                includes
                    .users
                    .into_iter()
                    .map(|user| (user.id, user.username))
                    .collect()
            })
            .unwrap_or_default();

        let posts = self
            .data
            .into_iter()
            .map(|tweet| {
                let metrics = tweet.public_metrics.unwrap_or_default();
                let author = tweet
                    .author_id
                    .map(|id| usernames.get(&id).cloned().unwrap_or(id));
                Post {
                    id: tweet.id,
                    text: tweet.text,
                    created_at: tweet.created_at.unwrap_or(fetched_at),
                    author,
                    like_count: metrics.like_count,
                    share_count: metrics.retweet_count,
                }
            })
            .collect();

        SearchPage {
            posts,
            next_token: self.meta.and_then(|meta| meta.next_token),
        }
    }
}

/// Maps a non-success status to the error taxonomy. 429 becomes the
/// distinguishable rate-limit signal; the wait comes from
/// `x-rate-limit-reset` (epoch seconds) when the API sends it.
pub fn status_error(
    status: StatusCode,
    headers: &HeaderMap,
    endpoint: &str,
    query: Option<&str>,
    now: DateTime<Utc>,
) -> SearchApiError {
    match status.as_u16() {
        429 => {
            let retry_after = headers
                .get("x-rate-limit-reset")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<i64>().ok())
                .map(|reset| (reset - now.timestamp()).max(0) as u64)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);
            SearchApiError::RateLimitExceeded { retry_after }
        }
        401 => SearchApiError::AuthenticationFailed {
            reason: "bearer token rejected".to_string(),
        },
        403 => SearchApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        400 => SearchApiError::InvalidQuery {
            query: query.unwrap_or_default().to_string(),
        },
        404 => SearchApiError::EndpointUnavailable {
            endpoint: endpoint.to_string(),
        },
        code if status.is_server_error() => SearchApiError::ServerError { status_code: code },
        code => SearchApiError::InvalidResponse {
            details: format!("unexpected status {} from {}", code, endpoint),
        },
    }
}

/// Twitter API v2 recent-search client authenticated with an app-only bearer
/// token.
#[derive(Debug)]
pub struct TwitterApiClient {
    http_client: Client,
    api_base: Url,
    bearer_token: String,
}

impl TwitterApiClient {
    pub fn new(api_base: &str, bearer_token: String, timeout: Duration) -> Result<Self, CoreError> {
        let base = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{}/", api_base)
        };
        let api_base = Url::parse(&base).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid search API base {}: {}", api_base, e),
        })?;

        let http_client = Client::builder()
            .user_agent(concat!("cashtag-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_base,
            bearer_token,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        self.api_base
            .join(endpoint)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid endpoint {}: {}", endpoint, e),
            })
    }

    async fn make_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint)?;

        debug!("Making search API request: GET {}", endpoint);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(query_params)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    CoreError::SearchApi(SearchApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        let query = query_params
            .iter()
            .find(|(key, _)| *key == "query")
            .map(|(_, value)| value.as_str());
        let api_error = status_error(status, response.headers(), endpoint, query, Utc::now());
        if matches!(api_error, SearchApiError::RateLimitExceeded { .. }) {
            warn!("Search API rate limited on {}: {}", endpoint, api_error);
        } else {
            error!("Request failed with status: {} for {}", status, endpoint);
        }
        Err(CoreError::SearchApi(api_error))
    }
}

impl SearchProvider for TwitterApiClient {
    async fn search_page(
        &self,
        request: &SearchRequest,
        next_token: Option<&str>,
    ) -> Result<SearchPage, CoreError> {
        let mut params: Vec<(&str, String)> = vec![
            ("query", request.query.clone()),
            ("max_results", request.max_results.to_string()),
            ("tweet.fields", "created_at,text,public_metrics,author_id".to_string()),
            ("expansions", "author_id".to_string()),
            ("user.fields", "username,name".to_string()),
        ];
        if let Some(start_time) = request.start_time {
            params.push((
                "start_time",
                start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ));
        }
        if let Some(token) = next_token {
            params.push(("next_token", token.to_string()));
        }

        let response = self.make_request("tweets/search/recent", &params).await?;
        let payload: SearchResponse = response.json().await.map_err(|e| {
            error!("Failed to parse search response: {}", e);
            CoreError::SearchApi(SearchApiError::InvalidResponse {
                details: format!("Failed to parse results for query {}", request.query),
            })
        })?;

        let page = payload.into_page(Utc::now());
        debug!(
            "Retrieved {} posts for query {}",
            page.posts.len(),
            request.query
        );
        Ok(page)
    }

    async fn check_connectivity(&self) -> Result<(), CoreError> {
        let response = self
            .make_request("users/by/username/twitter", &[])
            .await?;

        #[derive(Deserialize)]
        struct UserLookup {
            data: Option<UserData>,
        }

        let lookup: UserLookup = response.json().await.map_err(|e| {
            CoreError::SearchApi(SearchApiError::InvalidResponse {
                details: format!("Failed to parse user lookup: {}", e),
            })
        })?;

        match lookup.data {
            Some(user) => info!(
                "Connected to search API successfully! Found user: {}",
                user.username
            ),
            None => warn!("Search API connection works but returned empty data; access may be limited"),
        }
        Ok(())
    }
}
