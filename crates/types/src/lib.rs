#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for repofetch
//!
//! This crate provides the records shared by the metadata decoder, the
//! closure resolver, the delivery engine and the CLI.

pub mod package;
pub mod reports;

// Re-export commonly used types
pub use package::{final_segment, format_evr, Candidate, PackageRecord, ResolvedPackage};
pub use reports::{
    DeliveredArtifact, DeliveryReport, FailedDelivery, PlannedDelivery, RepositoryFailure,
    RunReport, SkippedDelivery,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Package ecosystem handled by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Rpm,
    Deb,
}

impl Ecosystem {
    /// Tag used in reports and log prefixes
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Deb => "deb",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

/// What to do when one repository of an ecosystem cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the ecosystem on the first repository failure
    FailFast,
    /// Record the failure and keep going with the remaining repositories
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::FailFast
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "continue" => Ok(Self::Continue),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

/// Which RPM solver backend resolves the RPM ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Built-in closure solver over primary XML
    Native,
    /// External helper program speaking the JSON solver protocol
    Command,
}

impl Default for SolverKind {
    fn default() -> Self {
        Self::Native
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown solver '{other}'")),
        }
    }
}

// Implement clap::ValueEnum for SolverKind
impl clap::ValueEnum for SolverKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Native, Self::Command]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Native => clap::builder::PossibleValue::new("native"),
            Self::Command => clap::builder::PossibleValue::new("command"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_orders_rpm_first() {
        let mut tags = vec![Ecosystem::Deb, Ecosystem::Rpm];
        tags.sort();
        assert_eq!(tags, vec![Ecosystem::Rpm, Ecosystem::Deb]);
        assert_eq!(Ecosystem::Deb.to_string(), "deb");
    }

    #[test]
    fn policy_and_solver_parse() {
        assert_eq!("continue".parse::<FailurePolicy>(), Ok(FailurePolicy::Continue));
        assert!("sometimes".parse::<FailurePolicy>().is_err());
        assert_eq!("command".parse::<SolverKind>(), Ok(SolverKind::Command));
        assert_eq!(SolverKind::default(), SolverKind::Native);
    }
}
