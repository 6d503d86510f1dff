//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status} for {url}: {message}")]
    HttpError {
        url: String,
        status: u16,
        message: String,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientInit(String),
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } => {
                Some("Check your network connection or the repository mirror and retry.")
            }
            Self::HttpError { status, .. } if *status == 404 => {
                Some("Verify the repository URL; the requested path does not exist.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedProtocol { .. } => {
                Some("Repository URLs must be absolute http(s) URLs.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::RequestFailed { .. }
            | Self::DownloadFailed(_) => true,
            Self::HttpError { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Timeout { .. } => "error.network.timeout",
            Self::ConnectionFailed { .. } => "error.network.connection",
            Self::RequestFailed { .. } => "error.network.request",
            Self::DownloadFailed(_) => "error.network.download",
            Self::InvalidUrl(_) => "error.network.invalid_url",
            Self::UnsupportedProtocol { .. } => "error.network.protocol",
            Self::HttpError { .. } => "error.network.http",
            Self::ClientInit(_) => "error.network.client",
        })
    }
}
