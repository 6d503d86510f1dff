//! HTTP client with connection pooling and retry logic

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use repofetch_errors::{Error, NetworkError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::retry::{calculate_backoff_delay, RetryConfig};

/// Statuses worth another attempt
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Longest wait for any single read; a steady body may take longer overall
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            retry_count: 3,
            retry_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.1,
            user_agent: format!("repofetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetConfig {
    /// Build from the `[network]` configuration section
    #[must_use]
    pub fn from_config(network: &repofetch_config::NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(network.timeout),
            connect_timeout: Duration::from_secs(network.connect_timeout),
            retry_count: network.retries,
            retry_delay: Duration::from_millis(network.retry_delay_ms),
            max_delay: Duration::from_millis(network.max_delay_ms),
            jitter_factor: network.jitter_factor,
            user_agent: network.user_agent.clone(),
            ..Self::default()
        }
    }

    /// Backoff parameters for transport retries
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_count,
            initial_delay: self.retry_delay,
            max_delay: self.max_delay,
            backoff_multiplier: 2.0,
            jitter_factor: self.jitter_factor,
        }
    }
}

/// HTTP client wrapper with retry logic
///
/// Idempotent requests are retried on connection failures, timeouts and
/// the statuses in [`RETRYABLE_STATUSES`]. When retries run out on a
/// retryable status the last response is returned for the caller to
/// inspect.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
    cancel: Option<CancellationToken>,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .read_timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            config,
            cancel: None,
        })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Abort requests and backoff sleeps once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Execute a GET request with retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent after all retry attempts.
    /// HTTP error statuses are returned as responses.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(url, || self.client.get(url)).await
    }

    /// Execute a GET request with extra headers and retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent after all retry attempts.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, Error> {
        self.retry_request(url, || {
            headers
                .iter()
                .fold(self.client.get(url), |req, (name, value)| {
                    req.header(*name, *value)
                })
        })
        .await
    }

    /// Execute a request with retries
    async fn retry_request<F>(&self, url: &str, build: F) -> Result<Response, Error>
    where
        F: Fn() -> RequestBuilder,
    {
        let retry_config = self.config.retry_config();
        let mut attempt = 0u32;

        loop {
            let retries_left = attempt < self.config.retry_count;
            let outcome = self.cancellable(build().send()).await?;

            let delay = match outcome {
                Ok(response) => {
                    if !retries_left || !is_retryable_status(response.status()) {
                        return Ok(response);
                    }
                    retry_after(&response, retry_config.max_delay)
                        .unwrap_or_else(|| calculate_backoff_delay(&retry_config, attempt + 1))
                }
                Err(e) => {
                    if !retries_left || !Self::should_retry(&e) {
                        return Err(Self::convert_error(url, &e));
                    }
                    calculate_backoff_delay(&retry_config, attempt + 1)
                }
            };

            self.cancellable(tokio::time::sleep(delay)).await?;
            attempt += 1;
        }
    }

    /// Race a future against the run-level cancellation token
    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T, Error> {
        match &self.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                tokio::select! {
                    () = token.cancelled() => Err(Error::Cancelled),
                    value = fut => Ok(value),
                }
            }
            None => Ok(fut.await),
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        // Retry on timeout, connection errors, and send failures
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    fn convert_error(url: &str, error: &reqwest::Error) -> Error {
        let url = url.to_string();
        if error.is_timeout() {
            NetworkError::Timeout { url }.into()
        } else if error.is_connect() {
            NetworkError::ConnectionFailed {
                url,
                message: error.to_string(),
            }
            .into()
        } else if error.is_builder() {
            NetworkError::InvalidUrl(format!("{url}: {error}")).into()
        } else {
            NetworkError::RequestFailed {
                url,
                message: error.to_string(),
            }
            .into()
        }
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Whether a status is transient
#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// `Retry-After` in seconds, ignored when longer than `max_delay`
fn retry_after(response: &Response, max_delay: Duration) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .filter(|d| *d <= max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for code in RETRYABLE_STATUSES {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::RANGE_NOT_SATISFIABLE));
    }

    #[test]
    fn config_from_network_section() {
        let section = repofetch_config::NetworkConfig {
            retries: 7,
            retry_delay_ms: 20,
            ..repofetch_config::NetworkConfig::default()
        };
        let config = NetConfig::from_config(&section);
        assert_eq!(config.retry_count, 7);
        assert_eq!(config.retry_delay, Duration::from_millis(20));
        assert_eq!(config.retry_config().max_retries, 7);
    }
}
