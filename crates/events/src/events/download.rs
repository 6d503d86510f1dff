use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::FailureContext;

/// Artifact delivery events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Dry run: the artifact would be downloaded
    Planned {
        package: String,
        url: String,
        destination: PathBuf,
    },

    /// Transfer attempt started
    Started {
        url: String,
        package: Option<String>,
        destination: PathBuf,
        resume_offset: u64,
        attempt: u32,
    },

    /// Server answered 416, file already complete
    AlreadyComplete { url: String, destination: PathBuf },

    /// Server ignored the range request, rewriting from zero
    RangeIgnored { url: String, discarded_bytes: u64 },

    /// Transfer attempt failed and will be retried
    Retrying {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        backoff_delay: Duration,
    },

    /// Transfer completed
    Completed {
        url: String,
        package: Option<String>,
        destination: PathBuf,
        bytes_written: u64,
        final_size: u64,
    },

    /// Transfer failed for good
    Failed {
        url: String,
        package: Option<String>,
        destination: PathBuf,
        failure: FailureContext,
    },

    /// Artifact skipped before any transfer
    Skipped { package: String, reason: String },

    /// Batch summary
    BatchCompleted {
        delivered: usize,
        skipped: usize,
        failed: usize,
    },
}
