//! Types for run requests

use repofetch_types::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Everything one run needs besides the context
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRequest {
    /// Requested package names
    pub packages: Vec<String>,
    /// RPM repository base URLs, in priority order
    pub rpm_repos: Vec<String>,
    /// Debian repository URLs, in priority order
    pub deb_repos: Vec<String>,
    /// Target RPM architecture; `None` disables arch scoping
    pub arch: Option<String>,
    pub use_rpm: bool,
    pub use_deb: bool,
    /// Plan deliveries without downloading
    pub dry_run: bool,
    /// List RPM candidates instead of solving
    pub rpm_probe: bool,
    /// Directory artifacts are written to
    pub output_dir: PathBuf,
    /// Behaviour when a repository cannot be read
    pub policy: FailurePolicy,
    /// Concurrent repository fetches and deliveries
    pub parallelism: usize,
}

impl RunRequest {
    /// Request for `packages` with both ecosystems enabled
    #[must_use]
    pub fn new(packages: Vec<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages,
            rpm_repos: Vec::new(),
            deb_repos: Vec::new(),
            arch: None,
            use_rpm: true,
            use_deb: true,
            dry_run: false,
            rpm_probe: false,
            output_dir: output_dir.into(),
            policy: FailurePolicy::default(),
            parallelism: 4,
        }
    }

    /// Destination for an artifact with the given final path segment
    ///
    /// `None` unless `filename` is a single plain component; `.` and `..`
    /// would not name a file inside `output_dir`.
    #[must_use]
    pub fn destination_for(&self, filename: &str) -> Option<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.output_dir.join(name)),
            _ => None,
        }
    }
}
