//! Pluggable RPM solvers
//!
//! The metadata decoder only hands over decompressed primary XML; a
//! [`PackageSolver`] turns it into an install set. Two implementations
//! exist: [`ClosureSolver`] runs in-process and [`CommandSolver`]
//! delegates to an external helper.

mod command;
mod evr;
mod native;
mod primary;

pub use command::CommandSolver;
pub use evr::{rpmvercmp, Evr};
pub use native::ClosureSolver;
pub use primary::{arch_matches, load_primary, Dependency, Solvable};

use async_trait::async_trait;
use repofetch_errors::Error;
use repofetch_net::join_url;
use repofetch_repository::RepoPrimary;
use repofetch_types::{final_segment, Candidate, ResolvedPackage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Primary metadata of one repository
#[derive(Debug, Clone)]
pub struct PrimarySource {
    pub repository: String,
    /// Shared so a pool can be handed to a blocking task without copying
    pub primary_xml: Arc<[u8]>,
}

impl From<RepoPrimary> for PrimarySource {
    fn from(primary: RepoPrimary) -> Self {
        Self {
            repository: primary.repository,
            primary_xml: primary.primary_xml.into(),
        }
    }
}

/// Ordered primary metadata sources plus an optional target architecture
#[derive(Debug, Clone, Default)]
pub struct MetadataPool {
    pub arch: Option<String>,
    pub sources: Vec<PrimarySource>,
}

impl MetadataPool {
    #[must_use]
    pub fn new(arch: Option<String>) -> Self {
        Self {
            arch,
            sources: Vec::new(),
        }
    }

    /// Build a pool from fetched repodata, keeping repository order
    #[must_use]
    pub fn from_primaries(primaries: Vec<RepoPrimary>, arch: Option<String>) -> Self {
        Self {
            arch,
            sources: primaries.into_iter().map(PrimarySource::from).collect(),
        }
    }

    pub fn add_source(&mut self, repository: impl Into<String>, primary_xml: Vec<u8>) {
        self.sources.push(PrimarySource {
            repository: repository.into(),
            primary_xml: primary_xml.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// One package of a solver's install set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedPackage {
    pub name: String,
    pub evr: String,
    pub arch: String,
    /// Repository URL the package was loaded from
    pub repository: String,
    /// Artifact path relative to `repository`
    pub location: Option<String>,
}

impl SolvedPackage {
    /// Downloadable form; `download_url` is `repository` joined with `location`
    #[must_use]
    pub fn to_resolved(&self) -> ResolvedPackage {
        let location = self.location.as_deref().filter(|l| !l.trim().is_empty());
        ResolvedPackage {
            name: self.name.clone(),
            download_url: location.map(|l| join_url(&self.repository, l)),
            local_filename: location.and_then(final_segment),
            evr: Some(self.evr.clone()),
            arch: Some(self.arch.clone()),
            repository: self.repository.clone(),
        }
    }
}

/// Opaque RPM dependency solver
#[async_trait]
pub trait PackageSolver: Send + Sync {
    /// Short name for events and errors
    fn name(&self) -> &str;

    /// Compute an install set for `names`, dependencies first
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::PackageNotFound` for a name with no candidate
    /// and `ResolveError::Unsatisfiable` carrying the requested names and
    /// the solver's explanation.
    async fn solve(&self, pool: &MetadataPool, names: &[String])
        -> Result<Vec<SolvedPackage>, Error>;

    /// List candidates per name, falling back to provides
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be loaded.
    async fn probe(
        &self,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<BTreeMap<String, Vec<Candidate>>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solved_to_resolved() {
        let solved = SolvedPackage {
            name: "bash".to_string(),
            evr: "5.1.8-6.el9".to_string(),
            arch: "x86_64".to_string(),
            repository: "http://mirror/BaseOS/x86_64/os".to_string(),
            location: Some("Packages/b/bash-5.1.8-6.el9.x86_64.rpm".to_string()),
        };
        let resolved = solved.to_resolved();
        assert_eq!(
            resolved.download_url.as_deref(),
            Some("http://mirror/BaseOS/x86_64/os/Packages/b/bash-5.1.8-6.el9.x86_64.rpm")
        );
        assert_eq!(
            resolved.local_filename.as_deref(),
            Some("bash-5.1.8-6.el9.x86_64.rpm")
        );
        assert_eq!(resolved.to_string(), "bash-5.1.8-6.el9.x86_64");
    }

    #[test]
    fn test_solved_without_location() {
        let solved = SolvedPackage {
            name: "virtual".to_string(),
            evr: "1-1".to_string(),
            arch: "noarch".to_string(),
            repository: "http://r/".to_string(),
            location: None,
        };
        let resolved = solved.to_resolved();
        assert!(resolved.download_url.is_none());
        assert!(resolved.local_filename.is_none());
    }
}
