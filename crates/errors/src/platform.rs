//! Helper process error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised while running external helper processes
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlatformError {
    #[error("helper not found: {helper} (searched {searched})")]
    HelperNotFound { helper: String, searched: String },

    #[error("failed to start {helper}: {message}")]
    SpawnFailed { helper: String, message: String },

    #[error("{helper} failed with exit code {}: {stderr}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    HelperFailed {
        helper: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{helper} produced invalid output: {message}")]
    InvalidOutput { helper: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::HelperNotFound { .. } => {
                Some("Install the helper in PATH or in the repofetch data directory under tools/bin.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::HelperNotFound { .. } => "error.platform.helper_not_found",
            Self::SpawnFailed { .. } => "error.platform.spawn",
            Self::HelperFailed { .. } => "error.platform.helper_failed",
            Self::InvalidOutput { .. } => "error.platform.invalid_output",
        })
    }
}
