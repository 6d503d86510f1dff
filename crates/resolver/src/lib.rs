#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution for repofetch
//!
//! Debian requests are closed locally over `Depends` edges. RPM requests
//! go through a [`PackageSolver`], either the built-in [`ClosureSolver`]
//! or an external helper wrapped by [`CommandSolver`].

mod closure;
pub mod solver;

pub use closure::{resolve_closure, ClosureResult};
pub use solver::{
    rpmvercmp, ClosureSolver, CommandSolver, MetadataPool, PackageSolver, PrimarySource,
    SolvedPackage,
};
