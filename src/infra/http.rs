//! # HTTP Module / HTTP 模块
//!
//! GET requests with a fixed retry policy: transient status codes and
//! connection errors are retried with exponential backoff, everything else
//! fails immediately.
//!
//! 带固定重试策略的 GET 请求：暂时性状态码和连接错误会以指数退避重试，
//! 其他错误立即失败。

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Longest single pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("GET {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("GET {url} still failing after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("response of GET {url} is not valid JSON")]
    Json {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// When and how long to wait before repeating a failed GET.
/// 失败的 GET 请求何时重试以及等待多久。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause before retry `n` is `backoff_factor * 2^(n-1)`.
    pub backoff_factor: Duration,
    /// Statuses treated as transient.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: Duration::from_secs(1),
            retry_statuses: vec![408, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Pause before the given retry (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }
}

/// A `reqwest` client bound to one retry policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, policy })
    }

    /// GETs `url`, retrying transient failures, and returns the successful response.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let attempts = self.policy.max_retries.saturating_add(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let pause = self.policy.backoff(attempt - 1);
                tracing::warn!(url, attempt, ?pause, "retrying after {last_failure}");
                tokio::time::sleep(pause).await;
            }

            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url, attempt, status = %response.status(), "fetched");
                    return Ok(response);
                }
                Ok(response) if self.policy.is_retryable_status(response.status()) => {
                    last_failure = format!("status {}", response.status());
                }
                Ok(response) => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: response.status(),
                    });
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_failure = e.to_string();
                }
                Err(source) => {
                    return Err(FetchError::Request {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last: last_failure,
        })
    }

    /// GETs `url` and returns the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })
    }

    /// GETs `url` and decodes the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.get(url)
            .await?
            .json()
            .await
            .map_err(|source| FetchError::Json {
                url: url.to_string(),
                source,
            })
    }
}
