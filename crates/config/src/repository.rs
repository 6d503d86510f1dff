//! Repository lists and their data-directory overrides

use repofetch_errors::ConfigError;
use repofetch_types::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rocky Linux 9 and EPEL 9 for x86_64
pub const BUILTIN_RPM_REPOS: &[&str] = &[
    "https://dl.rockylinux.org/pub/rocky/9/BaseOS/x86_64/os/",
    "https://dl.rockylinux.org/pub/rocky/9/AppStream/x86_64/os/",
    "https://dl.rockylinux.org/pub/rocky/9/CRB/x86_64/os/",
    "https://dl.fedoraproject.org/pub/epel/9/Everything/x86_64/",
];

/// Debian bullseye main and contrib for amd64
pub const BUILTIN_DEB_REPOS: &[&str] = &[
    "http://ftp.jp.debian.org/debian/dists/bullseye/main/binary-amd64/",
    "http://ftp.jp.debian.org/debian/dists/bullseye/contrib/binary-amd64/",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// RPM repository base URLs in priority order, empty means defaults
    #[serde(default)]
    pub rpm: Vec<String>,
    /// Debian repository URLs in priority order, empty means defaults
    #[serde(default)]
    pub deb: Vec<String>,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

/// Read a JSON array of repository URLs
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns `ConfigError::InvalidRepositoryList` when the file exists but is
/// unreadable, not a JSON array of strings, or an empty array.
pub async fn load_repository_list(path: &Path) -> Result<Option<Vec<String>>, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidRepositoryList {
        path: path.display().to_string(),
        message,
    };

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(invalid(e.to_string())),
    };

    let urls: Vec<String> = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
    let urls: Vec<String> = urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if urls.is_empty() {
        return Err(invalid("repository list is empty".to_string()));
    }
    Ok(Some(urls))
}

pub(crate) fn builtin(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}
