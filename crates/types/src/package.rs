//! Package-related type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Render an EVR string the way rpm prints it
#[must_use]
pub fn format_evr(epoch: &str, version: &str, release: &str) -> String {
    let mut out = String::new();
    if !epoch.is_empty() && epoch != "0" {
        out.push_str(epoch);
        out.push(':');
    }
    out.push_str(version);
    if !release.is_empty() {
        out.push('-');
        out.push_str(release);
    }
    out
}

/// One entry from a repository index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    /// Dependency names in declaration order
    pub depends: Vec<String>,
    /// Path of the artifact relative to `source_base_url`
    pub artifact_path: Option<String>,
    pub source_base_url: String,
}

impl PackageRecord {
    /// Create a record without an artifact
    #[must_use]
    pub fn new(name: impl Into<String>, source_base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
            artifact_path: None,
            source_base_url: source_base_url.into(),
        }
    }

    #[must_use]
    pub fn with_depends(mut self, depends: Vec<String>) -> Self {
        self.depends = depends;
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    /// Build the resolved form of this record
    ///
    /// An empty artifact path counts as absent.
    #[must_use]
    pub fn to_resolved(&self) -> ResolvedPackage {
        let artifact = self
            .artifact_path
            .as_deref()
            .filter(|p| !p.trim().is_empty());
        ResolvedPackage {
            name: self.name.clone(),
            download_url: artifact
                .map(|p| format!("{}{}", self.source_base_url, p.trim_start_matches('/'))),
            local_filename: artifact.and_then(final_segment),
            evr: None,
            arch: None,
            repository: self.source_base_url.clone(),
        }
    }
}

/// Final path segment of an artifact location
#[must_use]
pub fn final_segment(path: &str) -> Option<String> {
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Result of resolution for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub download_url: Option<String>,
    pub local_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    /// Base URL of the repository that supplied this package
    pub repository: String,
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.evr, &self.arch) {
            (Some(evr), Some(arch)) => write!(f, "{}-{}.{}", self.name, evr, arch),
            (Some(evr), None) => write!(f, "{}-{}", self.name, evr),
            _ => f.write_str(&self.name),
        }
    }
}

/// A candidate reported by a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub evr: String,
    pub arch: String,
    pub repository: String,
    /// Provide strings of this candidate that mention the probed name
    pub provides: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_from_record_with_artifact() {
        let record = PackageRecord::new("curl", "http://deb.example/")
            .with_artifact("pool/main/c/curl/curl_7.88_amd64.deb");
        let resolved = record.to_resolved();
        assert_eq!(
            resolved.download_url.as_deref(),
            Some("http://deb.example/pool/main/c/curl/curl_7.88_amd64.deb")
        );
        assert_eq!(resolved.local_filename.as_deref(), Some("curl_7.88_amd64.deb"));
        assert_eq!(resolved.repository, "http://deb.example/");
    }

    #[test]
    fn resolved_without_artifact_has_no_url() {
        let record = PackageRecord::new("virtual", "http://deb.example/").with_artifact("  ");
        let resolved = record.to_resolved();
        assert!(resolved.download_url.is_none());
        assert!(resolved.local_filename.is_none());
    }

    #[test]
    fn evr_omits_zero_epoch() {
        assert_eq!(format_evr("0", "1.2", "3.el9"), "1.2-3.el9");
        assert_eq!(format_evr("2", "1.2", "3.el9"), "2:1.2-3.el9");
        assert_eq!(format_evr("", "1.2", ""), "1.2");
    }

    #[test]
    fn display_includes_arch() {
        let pkg = ResolvedPackage {
            name: "bash".into(),
            download_url: None,
            local_filename: None,
            evr: Some("5.1.8-9.el9".into()),
            arch: Some("x86_64".into()),
            repository: "https://mirror/".into(),
        };
        assert_eq!(pkg.to_string(), "bash-5.1.8-9.el9.x86_64");
    }
}
