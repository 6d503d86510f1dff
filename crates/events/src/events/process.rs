use serde::{Deserialize, Serialize};

/// Helper process lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProcessEvent {
    /// Helper started, command line has credentials masked
    Spawned { helper: String, command: String },

    /// Helper exited
    Exited {
        helper: String,
        code: Option<i32>,
        duration_ms: u64,
    },

    /// Running helpers were killed on teardown
    Terminated { count: usize },
}
