//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use repofetch_ops::report_to_json;
use repofetch_types::{Candidate, DeliveryReport, Ecosystem, ResolvedPackage, RunReport};
use std::collections::BTreeMap;
use std::io;

/// Output renderer for run reports
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render a run report
    pub fn render_report(&self, report: &RunReport) -> io::Result<()> {
        if self.json_output {
            let json = report_to_json(report).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        for text in render_tables(report) {
            println!("{text}");
        }
        Ok(())
    }
}

/// Table text for every section of the report, in display order
fn render_tables(report: &RunReport) -> Vec<String> {
    let mut sections = Vec::new();

    if !report.probes.is_empty() {
        sections.push("RPM candidates:".to_string());
        sections.push(probe_table(&report.probes).to_string());
    }

    for (ecosystem, packages) in &report.resolved {
        if packages.is_empty() {
            continue;
        }
        sections.push(format!("Resolved {} packages ({}):", ecosystem, packages.len()));
        sections.push(resolved_table(packages).to_string());

        if let Some(deliveries) = report.deliveries.get(ecosystem) {
            sections.push(delivery_summary(*ecosystem, deliveries));
            if !deliveries.failed.is_empty() {
                sections.push(failure_table(deliveries).to_string());
            }
        }
    }

    for failure in &report.repository_failures {
        sections.push(format!(
            "Skipped {} repository {}: {}",
            failure.ecosystem, failure.url, failure.error
        ));
    }

    if sections.is_empty() {
        sections.push("Nothing resolved.".to_string());
    }
    sections
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn resolved_table(packages: &[ResolvedPackage]) -> Table {
    let mut table = new_table(&["Package", "Version", "Arch", "Repository"]);
    for package in packages {
        table.add_row(vec![
            Cell::new(&package.name),
            Cell::new(package.evr.as_deref().unwrap_or("-")),
            Cell::new(package.arch.as_deref().unwrap_or("-")),
            Cell::new(&package.repository),
        ]);
    }
    table
}

fn probe_table(probes: &BTreeMap<String, Vec<Candidate>>) -> Table {
    let mut table = new_table(&["Requested", "Candidate", "Version", "Arch", "Repository"]);
    for (requested, candidates) in probes {
        if candidates.is_empty() {
            table.add_row(vec![
                Cell::new(requested),
                Cell::new("not found").fg(Color::Red),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        for candidate in candidates {
            table.add_row(vec![
                Cell::new(requested),
                Cell::new(&candidate.name),
                Cell::new(&candidate.evr),
                Cell::new(&candidate.arch),
                Cell::new(&candidate.repository),
            ]);
        }
    }
    table
}

fn failure_table(deliveries: &DeliveryReport) -> Table {
    let mut table = new_table(&["Package", "Destination", "Error"]);
    for failed in &deliveries.failed {
        table.add_row(vec![
            Cell::new(&failed.name).fg(Color::Red),
            Cell::new(failed.destination.display()),
            Cell::new(&failed.error),
        ]);
    }
    table
}

fn delivery_summary(ecosystem: Ecosystem, deliveries: &DeliveryReport) -> String {
    if !deliveries.planned.is_empty() {
        let mut lines = vec![format!(
            "Dry run: {} {} artifacts planned",
            deliveries.planned.len(),
            ecosystem
        )];
        lines.extend(
            deliveries
                .planned
                .iter()
                .map(|p| format!("  {} -> {}", p.url, p.destination.display())),
        );
        return lines.join("\n");
    }

    let resumed = deliveries
        .delivered
        .iter()
        .filter(|d| d.resumed_from > 0 || d.already_complete)
        .count();
    format!(
        "Delivered {} {} artifacts ({} bytes, {} resumed), {} skipped, {} failed",
        deliveries.delivered.len(),
        ecosystem,
        deliveries.bytes_written(),
        resumed,
        deliveries.skipped.len(),
        deliveries.failed.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofetch_types::{DeliveredArtifact, FailedDelivery, PlannedDelivery};
    use std::path::PathBuf;

    fn package(name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            download_url: Some(format!("http://r/pool/{name}.deb")),
            local_filename: Some(format!("{name}.deb")),
            evr: None,
            arch: None,
            repository: "http://r/".to_string(),
        }
    }

    #[test]
    fn test_summary_counts_resumed_artifacts() {
        let deliveries = DeliveryReport {
            delivered: vec![
                DeliveredArtifact {
                    name: "a".into(),
                    destination: PathBuf::from("out/a.deb"),
                    bytes_written: 10,
                    resumed_from: 4,
                    already_complete: false,
                    attempts: 2,
                },
                DeliveredArtifact {
                    name: "b".into(),
                    destination: PathBuf::from("out/b.deb"),
                    bytes_written: 5,
                    resumed_from: 0,
                    already_complete: false,
                    attempts: 1,
                },
            ],
            failed: vec![FailedDelivery {
                name: "c".into(),
                url: "http://r/c.deb".into(),
                destination: PathBuf::from("out/c.deb"),
                error: "boom".into(),
            }],
            ..DeliveryReport::default()
        };

        assert_eq!(
            delivery_summary(Ecosystem::Deb, &deliveries),
            "Delivered 2 deb artifacts (15 bytes, 1 resumed), 0 skipped, 1 failed"
        );
    }

    #[test]
    fn test_dry_run_summary_lists_plan() {
        let deliveries = DeliveryReport {
            planned: vec![PlannedDelivery {
                name: "a".into(),
                url: "http://r/a.rpm".into(),
                destination: PathBuf::from("out/a.rpm"),
            }],
            ..DeliveryReport::default()
        };
        let summary = delivery_summary(Ecosystem::Rpm, &deliveries);
        assert!(summary.starts_with("Dry run: 1 rpm artifacts planned"));
        assert!(summary.contains("http://r/a.rpm -> out/a.rpm"));
    }

    #[test]
    fn test_sections_follow_report() {
        let mut report = RunReport::default();
        assert_eq!(render_tables(&report), vec!["Nothing resolved."]);

        report
            .resolved
            .insert(Ecosystem::Deb, vec![package("app"), package("util")]);
        report
            .deliveries
            .insert(Ecosystem::Deb, DeliveryReport::default());
        let sections = render_tables(&report);
        assert_eq!(sections[0], "Resolved deb packages (2):");
        assert!(sections[1].contains("util"));
        assert!(sections[2].starts_with("Delivered 0 deb artifacts"));
    }
}
