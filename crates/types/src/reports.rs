//! Report type definitions for runs

use crate::{Candidate, Ecosystem, ResolvedPackage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Aggregated result of one run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Resolved packages per ecosystem tag
    pub resolved: BTreeMap<Ecosystem, Vec<ResolvedPackage>>,
    /// Probe candidates per requested name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub probes: BTreeMap<String, Vec<Candidate>>,
    #[serde(default)]
    pub deliveries: BTreeMap<Ecosystem, DeliveryReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repository_failures: Vec<RepositoryFailure>,
}

impl RunReport {
    /// Total number of failed deliveries across ecosystems
    #[must_use]
    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.values().map(|d| d.failed.len()).sum()
    }
}

/// Outcome of a delivery batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub delivered: Vec<DeliveredArtifact>,
    /// Dry-run plan
    pub planned: Vec<PlannedDelivery>,
    pub skipped: Vec<SkippedDelivery>,
    pub failed: Vec<FailedDelivery>,
}

impl DeliveryReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total bytes written across delivered artifacts
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.delivered.iter().map(|d| d.bytes_written).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredArtifact {
    pub name: String,
    pub destination: PathBuf,
    pub bytes_written: u64,
    /// Offset the transfer resumed from, 0 for fresh downloads
    pub resumed_from: u64,
    /// Server answered 416, the file was already complete
    pub already_complete: bool,
    pub attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDelivery {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDelivery {
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
    pub error: String,
}

/// A repository that could not be read under the continue policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFailure {
    pub ecosystem: Ecosystem,
    pub url: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_ecosystem_keys() {
        let mut report = RunReport::default();
        report.resolved.insert(Ecosystem::Deb, Vec::new());
        report.resolved.insert(Ecosystem::Rpm, Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["resolved"].get("rpm").is_some());
        assert!(json["resolved"].get("deb").is_some());
        assert!(json.get("probes").is_none());
    }

    #[test]
    fn failed_deliveries_are_counted() {
        let mut report = RunReport::default();
        let mut deb = DeliveryReport::default();
        deb.failed.push(FailedDelivery {
            name: "a".into(),
            url: "http://h/a.deb".into(),
            destination: PathBuf::from("out/a.deb"),
            error: "boom".into(),
        });
        report.deliveries.insert(Ecosystem::Deb, deb);
        report.deliveries.insert(Ecosystem::Rpm, DeliveryReport::default());
        assert_eq!(report.failed_deliveries(), 1);
    }
}
