//! Dependency resolution error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolveError {
    #[error("RPM package not found: {name}")]
    PackageNotFound { name: String },

    #[error("RPM dependency solve failed for [{}]: {explanation}", requested.join(", "))]
    Unsatisfiable {
        requested: Vec<String>,
        explanation: String,
    },

    #[error("solver '{solver}' failed: {message}")]
    SolverFailed { solver: String, message: String },
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound { .. } => {
                Some("Check the package name, or add the repository that provides it with --rpm-repo.")
            }
            Self::Unsatisfiable { .. } => {
                Some("Add repositories that provide the missing dependencies, or use --rpm-probe to inspect candidates.")
            }
            Self::SolverFailed { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::PackageNotFound { .. } => "error.resolve.not_found",
            Self::Unsatisfiable { .. } => "error.resolve.unsatisfiable",
            Self::SolverFailed { .. } => "error.resolve.solver",
        })
    }
}
