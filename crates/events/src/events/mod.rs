use serde::{Deserialize, Serialize};

use repofetch_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod download;
pub mod general;
pub mod process;
pub mod repo;
pub mod resolver;

pub use download::*;
pub use general::*;
pub use process::*;
pub use repo::*;
pub use resolver::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Repository metadata acquisition
    Repo(RepoEvent),

    /// Dependency resolution
    Resolver(ResolverEvent),

    /// Artifact delivery
    Download(DownloadEvent),

    /// External helper processes
    Process(ProcessEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Repo(RepoEvent::FetchFailed { .. })
            | Self::Resolver(ResolverEvent::ResolutionFailed { .. })
            | Self::Download(DownloadEvent::Failed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(
                GeneralEvent::Warning { .. } | GeneralEvent::CancellationRequested { .. },
            )
            | Self::Resolver(ResolverEvent::MissingArtifact { .. })
            | Self::Download(DownloadEvent::Retrying { .. } | DownloadEvent::RangeIgnored { .. })
            | Self::Process(ProcessEvent::Terminated { .. }) => Level::WARN,

            // Debug-level events
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Repo(RepoEvent::PrimaryLocated { .. } | RepoEvent::DuplicateIgnored { .. })
            | Self::Resolver(ResolverEvent::UnknownDependency { .. })
            | Self::Download(DownloadEvent::Started { .. })
            | Self::Process(ProcessEvent::Spawned { .. } | ProcessEvent::Exited { .. }) => {
                Level::DEBUG
            }

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "repofetch::events::general",
            Self::Repo(_) => "repofetch::events::repo",
            Self::Resolver(_) => "repofetch::events::resolver",
            Self::Download(_) => "repofetch::events::download",
            Self::Process(_) => "repofetch::events::process",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofetch_types::Ecosystem;
    use tracing::Level;

    #[test]
    fn failures_log_at_error() {
        let failure = FailureContext::new(None::<String>, "boom", None::<String>, false);
        let event = AppEvent::Repo(RepoEvent::FetchFailed {
            ecosystem: Ecosystem::Deb,
            url: "http://h/".into(),
            failure,
        });
        assert_eq!(event.log_level(), Level::ERROR);
        assert_eq!(event.log_target(), "repofetch::events::repo");
    }

    #[test]
    fn retries_log_at_warn() {
        let event = AppEvent::Download(DownloadEvent::Retrying {
            url: "http://h/a".into(),
            attempt: 1,
            max_attempts: 3,
            reason: "reset".into(),
            backoff_delay: std::time::Duration::from_millis(10),
        });
        assert_eq!(event.log_level(), Level::WARN);
    }

    #[test]
    fn serializes_with_domain_tag() {
        let event = AppEvent::General(GeneralEvent::warning("careful"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["domain"], "general");
        assert_eq!(value["event"]["type"], "Warning");
    }

    #[test]
    fn failure_context_from_error() {
        let err = repofetch_errors::MetadataError::PrimaryNotFound {
            repo_url: "https://m/".into(),
        };
        let ctx = FailureContext::from_error(&err);
        assert_eq!(ctx.code.as_deref(), Some("error.metadata.primary_not_found"));
        assert!(ctx.message.contains("https://m/"));
        assert!(!ctx.retryable);
    }
}
