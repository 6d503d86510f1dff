use repofetch_types::Ecosystem;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Resolver domain events for dependency resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverEvent {
    /// Resolution flow started
    ResolutionStarted {
        ecosystem: Ecosystem,
        requested: Vec<String>,
    },

    /// A required name has no record in any repository
    UnknownDependency { ecosystem: Ecosystem, name: String },

    /// Resolved package has no artifact location
    MissingArtifact { ecosystem: Ecosystem, name: String },

    /// Resolution completed successfully
    ResolutionCompleted {
        ecosystem: Ecosystem,
        total_packages: usize,
        duration_ms: u64,
    },

    /// Resolution failed
    ResolutionFailed {
        ecosystem: Ecosystem,
        failure: FailureContext,
    },

    /// Probe results for one requested name
    ProbeCompleted { name: String, candidates: usize },
}
