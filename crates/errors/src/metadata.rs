//! Repository metadata error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetadataError {
    #[error("primary metadata not found for {repo_url}")]
    PrimaryNotFound { repo_url: String },

    #[error("unsupported repodata compression '{extension}' for {source_name}")]
    UnsupportedCompression {
        extension: String,
        source_name: String,
    },

    #[error("missing optional decompressor '{codec}' for {source_name}: {requirement}")]
    MissingDecompressor {
        codec: String,
        requirement: String,
        source_name: String,
    },

    #[error("failed to decompress {source_name}: {message}")]
    DecompressionFailed {
        source_name: String,
        message: String,
    },

    #[error("invalid XML in {url}: {message}")]
    InvalidXml { url: String, message: String },
}

impl UserFacingError for MetadataError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PrimaryNotFound { .. } => {
                Some("The repository has no primary metadata; check that the URL points at an RPM repository root.")
            }
            Self::MissingDecompressor { .. } => {
                Some("Rebuild repofetch with the `zstd` feature enabled to read .zst repodata.")
            }
            Self::UnsupportedCompression { .. } => {
                Some("Only .gz, .xz and .zst repodata are supported.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::PrimaryNotFound { .. } => "error.metadata.primary_not_found",
            Self::UnsupportedCompression { .. } => "error.metadata.unsupported_compression",
            Self::MissingDecompressor { .. } => "error.metadata.missing_decompressor",
            Self::DecompressionFailed { .. } => "error.metadata.decompression",
            Self::InvalidXml { .. } => "error.metadata.invalid_xml",
        })
    }
}
