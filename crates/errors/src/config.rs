//! Configuration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },

    #[error("parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("invalid repository list in {path}: {message}")]
    InvalidRepositoryList { path: String, message: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("Create the file or omit --config to use the default location.")
            }
            Self::InvalidValue { field, .. } => Some(match field.as_str() {
                "rpm.solver" => "Use `native` or `command` for the RPM solver.",
                "repositories.on_error" => "Use `fail-fast` or `continue` for repository failures.",
                _ => "Fix the configuration value and retry the command.",
            }),
            Self::Invalid { .. } | Self::ParseError { .. } => {
                Some("Fix the configuration value and retry the command.")
            }
            Self::InvalidRepositoryList { .. } => {
                Some("Repository list files must contain a JSON array of URL strings.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "error.config.not_found",
            Self::Invalid { .. } => "error.config.invalid",
            Self::ParseError { .. } => "error.config.parse",
            Self::InvalidValue { .. } => "error.config.invalid_value",
            Self::InvalidRepositoryList { .. } => "error.config.repository_list",
        })
    }
}
