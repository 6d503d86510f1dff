#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform layer for running external helper processes.
//!
//! Helpers are spawned through a [`ProcessRegistry`], an owned handle that
//! tracks every live child so a signal handler can tear them all down.
//! Command lines are logged with URL credentials masked.

pub mod lookup;
pub mod process;
pub mod registry;

pub use lookup::resolve_program;
pub use process::{mask_credentials, CommandOutput, HelperCommand, ProcessOperations};
pub use registry::{HelperGuard, ProcessRegistry};
