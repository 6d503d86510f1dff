//! Command line interface definition

use clap::Parser;
use repofetch_types::{FailurePolicy, SolverKind};
use std::path::PathBuf;

/// repofetch - resolve packages against RPM and Debian repositories and download them
#[derive(Parser, Debug)]
#[command(name = "repofetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve packages and download their artifacts with dependencies")]
#[command(long_about = None)]
pub struct Cli {
    /// Package names to resolve
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Directory artifacts are written to
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// RPM repository base URL (repeatable, replaces the defaults)
    #[arg(long = "rpm-repo", value_name = "URL")]
    pub rpm_repos: Vec<String>,

    /// Debian repository URL (repeatable, replaces the defaults)
    #[arg(long = "deb-repo", value_name = "URL")]
    pub deb_repos: Vec<String>,

    /// Target RPM architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// Skip the RPM ecosystem
    #[arg(long)]
    pub no_rpm: bool,

    /// Skip the Debian ecosystem
    #[arg(long)]
    pub no_deb: bool,

    /// Resolve and print the download plan without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// List RPM candidates per name instead of solving
    #[arg(long)]
    pub rpm_probe: bool,

    /// RPM solver backend
    #[arg(long, value_enum)]
    pub solver: Option<SolverKind>,

    /// What to do when a repository cannot be read (fail-fast or continue)
    #[arg(long, value_name = "POLICY")]
    pub on_error: Option<FailurePolicy>,

    /// Concurrent repository fetches and downloads
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Output and configuration arguments
#[derive(Parser, Debug)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging to the data directory's logs/
    #[arg(long)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
