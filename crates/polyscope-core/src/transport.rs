//! Rate-limited, retrying execution path for all outbound calls.
//!
//! Every request from every source client funnels through one
//! [`Transport`], so the provider-wide budget and retry policy are enforced
//! in exactly one place.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::rate_limit::RateBudget;
use crate::retry::RetryConfig;

/// The terminal failure of a single attempt, kept for error reporting after
/// retries run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Network(HttpError),
    Status { status: u16, body: String },
}

impl Display for FailureCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(err) => write!(f, "network error: {err}"),
            Self::Status { status, .. } => write!(f, "http status {status}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// All attempts failed with transient errors; carries the final cause.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: FailureCause },

    /// Non-retryable response (4xx other than 408/429). The caller's
    /// request is wrong; retrying would not help.
    #[error("http status {status}")]
    Status { status: u16, body: String },

    /// Non-retryable network failure.
    #[error("network error: {0}")]
    Network(HttpError),

    /// The upstream answered, but the payload would not parse.
    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted {
                last: FailureCause::Status { status: 429, .. },
                ..
            }
        )
    }
}

/// Shared execution path: acquire budget, send, retry on transient failure.
#[derive(Clone)]
pub struct Transport {
    http: Arc<dyn HttpClient>,
    budget: RateBudget,
    retry: RetryConfig,
}

impl Transport {
    pub fn new(http: Arc<dyn HttpClient>, budget: RateBudget, retry: RetryConfig) -> Self {
        Self {
            http,
            budget,
            retry,
        }
    }

    /// Default policy: 60 requests per minute, 3 retries with exponential
    /// backoff.
    pub fn with_defaults(http: Arc<dyn HttpClient>) -> Self {
        Self::new(http, RateBudget::per_minute(60), RetryConfig::default())
    }

    /// Execute a request, consuming one budget slot per attempt.
    ///
    /// Transient failures (retryable network errors, all 5xx statuses,
    /// and the configured extra codes) are retried with backoff; anything
    /// else surfaces immediately. Exhaustion reports the final cause.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let attempts = self.retry.max_retries + 1;
        let mut last_cause: Option<FailureCause> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt - 1);
                warn!(
                    url = %request.url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }

            self.budget.acquire().await;
            debug!(url = %request.url, attempt, "sending request");

            match self.http.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if self.retry.should_retry_status(response.status) => {
                    last_cause = Some(FailureCause::Status {
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response) => {
                    return Err(TransportError::Status {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) if err.retryable() => {
                    last_cause = Some(FailureCause::Network(err));
                }
                Err(err) => return Err(TransportError::Network(err)),
            }
        }

        Err(TransportError::RetriesExhausted {
            attempts,
            last: last_cause.unwrap_or_else(|| {
                FailureCause::Network(HttpError::new("no attempt was made"))
            }),
        })
    }

    /// Execute and deserialize a JSON body.
    pub async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, TransportError> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        serde_json::from_str(&response.body).map_err(|err| TransportError::Decode {
            url,
            message: err.to_string(),
        })
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }
}
