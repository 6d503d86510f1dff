//! Artifact delivery error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeliveryError {
    #[error("download of {url} to {destination} failed after {attempts} attempts: {last_error}")]
    AttemptsExhausted {
        url: String,
        destination: String,
        attempts: u32,
        last_error: String,
    },

    #[error("destination {path} is not writable: {message}")]
    Unwritable { path: String, message: String },

    #[error("destination {path} is already targeted by another transfer")]
    DuplicateDestination { path: String },

    #[error("stream from {url} stalled for {seconds}s")]
    Stalled { url: String, seconds: u64 },
}

impl UserFacingError for DeliveryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AttemptsExhausted { .. } => {
                Some("The partial file was kept; rerun the command to resume the transfer.")
            }
            Self::Unwritable { .. } => Some("Check permissions of the output directory."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::AttemptsExhausted { .. } | Self::Stalled { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::AttemptsExhausted { .. } => "error.delivery.exhausted",
            Self::Unwritable { .. } => "error.delivery.unwritable",
            Self::DuplicateDestination { .. } => "error.delivery.duplicate",
            Self::Stalled { .. } => "error.delivery.stalled",
        })
    }
}
