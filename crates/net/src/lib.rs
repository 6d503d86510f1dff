#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for repofetch
//!
//! This crate handles all HTTP operations: the retrying transport used for
//! metadata fetches and the resumable delivery engine used for artifacts.

mod client;
pub mod delivery;
mod retry;

pub use client::{is_retryable_status, NetClient, NetConfig, RETRYABLE_STATUSES};
pub use delivery::{ArtifactDownloader, DeliveryConfig, DeliveryOutcome, DeliveryTarget};
pub use retry::{calculate_backoff_delay, RetryConfig};

use bytes::Bytes;
use reqwest::Response;
use repofetch_errors::{Error, NetworkError};
use url::Url;

/// Fetch binary content from a URL
///
/// # Errors
///
/// Returns `NetworkError::HttpError` naming the URL when the final response
/// is not a success, or a transport error if the request cannot be sent.
pub async fn fetch_bytes(client: &NetClient, url: &str) -> Result<Bytes, Error> {
    let response = client.get(url).await?;
    response_bytes(response, url).await
}

/// Buffer the body of a response that must be a success
///
/// # Errors
///
/// Returns `NetworkError::HttpError` for a non-2xx status and
/// `NetworkError::RequestFailed` if the body cannot be read.
pub async fn response_bytes(response: Response, url: &str) -> Result<Bytes, Error> {
    let status = response.status();

    if !status.is_success() {
        return Err(NetworkError::HttpError {
            url: url.to_string(),
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
        .into());
    }

    response.bytes().await.map_err(|e| {
        NetworkError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or not http(s).
pub fn parse_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }
        .into()),
    }
}

/// Return `url` with exactly one trailing slash appended if missing
#[must_use]
pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Resolve a repository-relative path against a base URL
///
/// Absolute URLs are returned unchanged.
#[must_use]
pub fn join_url(base: &str, relative: &str) -> String {
    if relative.starts_with("http://") || relative.starts_with("https://") {
        return relative.to_string();
    }
    format!(
        "{}{}",
        ensure_trailing_slash(base),
        relative.trim_start_matches('/')
    )
}
