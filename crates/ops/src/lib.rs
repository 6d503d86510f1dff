#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for repofetch
//!
//! This crate serves as the orchestration layer between the CLI and the
//! specialized crates: it wires repository collection, dependency
//! resolution and artifact delivery into one run.

mod context;
mod run;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use run::run;
pub use types::RunRequest;

use repofetch_errors::{Error, OpsError};
use repofetch_types::RunReport;

/// Render a run report as pretty-printed JSON
///
/// # Errors
///
/// Returns `OpsError::SerializationError` if the report cannot be encoded.
pub fn report_to_json(report: &RunReport) -> Result<String, Error> {
    serde_json::to_string_pretty(report).map_err(|e| {
        OpsError::SerializationError {
            message: e.to_string(),
        }
        .into()
    })
}
