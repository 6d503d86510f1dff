use repofetch_types::Ecosystem;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Repository metadata acquisition events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepoEvent {
    /// Index fetch for one repository started
    FetchStarted { ecosystem: Ecosystem, url: String },

    /// `repomd.xml` was missing under `os/`, retrying the parent URL
    FallbackApplied { from_url: String, to_url: String },

    /// Primary metadata location found in `repomd.xml`
    PrimaryLocated { repository: String, href: String },

    /// Index decoded
    FetchCompleted {
        ecosystem: Ecosystem,
        url: String,
        bytes: usize,
        packages: Option<usize>,
    },

    /// Repository could not be read
    FetchFailed {
        ecosystem: Ecosystem,
        url: String,
        failure: FailureContext,
    },

    /// Package already known from an earlier repository
    DuplicateIgnored {
        name: String,
        kept_from: String,
        ignored_from: String,
    },
}
