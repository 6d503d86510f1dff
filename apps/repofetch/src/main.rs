//! repofetch - resolve packages against RPM and Debian repositories
//!
//! This is the CLI application: it loads configuration, wires the
//! operations context, drains library events into tracing and renders the
//! run report.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::Cli;
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::logging::{init_tracing, log_event_with_tracing};
use clap::Parser;
use repofetch_config::{Config, RepositorySource};
use repofetch_events::{AppEvent, EventEmitter, EventReceiver, EventSender, GeneralEvent};
use repofetch_net::{ArtifactDownloader, DeliveryConfig, NetClient, NetConfig};
use repofetch_ops::{OpsContextBuilder, OpsCtx, RunRequest};
use repofetch_platform::ProcessRegistry;
use repofetch_resolver::{ClosureSolver, CommandSolver, PackageSolver};
use repofetch_types::{Ecosystem, OutputFormat, RunReport, SolverKind};
use std::process;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_flag = cli.global.json;

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_flag {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(&cli.global.config).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli);
    config.validate()?;

    let json_mode = cli.global.json || config.general.default_output == OutputFormat::Json;
    init_tracing(json_mode, cli.global.debug, &config.logs_dir());
    info!("Starting repofetch v{}", env!("CARGO_PKG_VERSION"));

    let request = build_request(&cli, &config).await;

    let cancel = CancellationToken::new();
    let (event_sender, event_receiver) = repofetch_events::channel();
    let registry = ProcessRegistry::new(&cancel, Some(event_sender.clone()));
    spawn_signal_handler(cancel.clone(), registry.clone(), event_sender.clone());

    let ops_ctx = build_ops_context(&config, &registry, event_sender, cancel)?;

    let report = execute_with_events(ops_ctx, request, event_receiver).await?;

    OutputRenderer::new(json_mode).render_report(&report)?;

    let failed = report.failed_deliveries();
    if failed > 0 {
        let total = report
            .deliveries
            .values()
            .map(|d| d.delivered.len() + d.failed.len())
            .sum();
        return Err(CliError::DeliveriesFailed { failed, total });
    }

    info!("Run completed successfully");
    Ok(())
}

/// Run the operation while draining events into tracing
async fn execute_with_events(
    ctx: OpsCtx,
    request: RunRequest,
    mut event_receiver: EventReceiver,
) -> Result<RunReport, CliError> {
    let mut run_future = Box::pin(async move { repofetch_ops::run(&ctx, request).await });

    loop {
        select! {
            result = &mut run_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    log_event_with_tracing(&event);
                }
                return result.map_err(CliError::from);
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => log_event_with_tracing(&event),
                    None => break,
                }
            }
        }
    }

    // Channel closed: no more events, just wait for the run
    run_future.await.map_err(CliError::from)
}

/// Build operations context with all required components
fn build_ops_context(
    config: &Config,
    registry: &ProcessRegistry,
    event_sender: EventSender,
    cancel: CancellationToken,
) -> Result<OpsCtx, CliError> {
    let net = NetClient::new(NetConfig::from_config(&config.network))?
        .with_cancellation(cancel.clone());

    let downloader = ArtifactDownloader::new(net.clone(), DeliveryConfig::from_config(config))
        .with_events(event_sender.clone())
        .with_cancellation(cancel.clone());

    let solver: Arc<dyn PackageSolver> = match config.rpm.solver {
        SolverKind::Native => Arc::new(ClosureSolver::new()),
        SolverKind::Command => Arc::new(
            CommandSolver::new(config.rpm.solver_command.clone(), Arc::new(registry.clone()))
                .with_fallback_dirs(vec![config.tools_bin_dir()]),
        ),
    };

    let ctx = OpsContextBuilder::new()
        .with_net(net)
        .with_downloader(downloader)
        .with_solver(solver)
        .with_event_sender(event_sender)
        .with_config(config.clone())
        .with_cancellation(cancel)
        .build()?;

    Ok(ctx)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, cli: &Cli) {
    if let Some(out) = &cli.out {
        config.general.output_dir.clone_from(out);
    }
    if let Some(jobs) = cli.jobs {
        config.general.parallel_downloads = jobs;
    }
    if let Some(arch) = &cli.arch {
        config.rpm.arch.clone_from(arch);
    }
    if let Some(solver) = cli.solver {
        config.rpm.solver = solver;
    }
    if let Some(policy) = cli.on_error {
        config.repositories.on_error = policy;
    }
    if !cli.rpm_repos.is_empty() {
        config.repositories.rpm.clone_from(&cli.rpm_repos);
    }
    if !cli.deb_repos.is_empty() {
        config.repositories.deb.clone_from(&cli.deb_repos);
    }
    if cli.global.json {
        config.general.default_output = OutputFormat::Json;
    }
}

/// Turn configuration and flags into a run request
async fn build_request(cli: &Cli, config: &Config) -> RunRequest {
    let mut request = RunRequest::new(cli.packages.clone(), config.general.output_dir.clone());
    request.use_rpm = !cli.no_rpm;
    request.use_deb = !cli.no_deb;
    request.dry_run = cli.dry_run;
    request.rpm_probe = cli.rpm_probe;
    request.arch = Some(config.rpm.arch.clone());
    request.policy = config.repositories.on_error;
    request.parallelism = config.general.parallel_downloads;

    if request.use_rpm {
        request.rpm_repos = repositories(config, Ecosystem::Rpm).await;
    }
    if request.use_deb {
        request.deb_repos = repositories(config, Ecosystem::Deb).await;
    }
    request
}

async fn repositories(config: &Config, ecosystem: Ecosystem) -> Vec<String> {
    let selection = config.repositories_for(ecosystem).await;
    if let Some(problem) = &selection.ignored {
        warn!(ecosystem = %ecosystem, "Ignoring repository override: {problem}");
    }
    match &selection.source {
        RepositorySource::Config => info!(ecosystem = %ecosystem, "Using configured repositories"),
        RepositorySource::DataDir(path) => {
            info!(ecosystem = %ecosystem, path = %path.display(), "Using repository override file");
        }
        RepositorySource::Builtin => info!(ecosystem = %ecosystem, "Using built-in repositories"),
    }
    selection.urls
}

/// Cancel the run and kill helpers on Ctrl+C or SIGTERM
fn spawn_signal_handler(cancel: CancellationToken, registry: ProcessRegistry, tx: EventSender) {
    tokio::spawn(async move {
        let reason = wait_for_shutdown_signal().await;
        tx.emit(AppEvent::General(GeneralEvent::CancellationRequested {
            reason: reason.to_string(),
        }));
        registry.terminate_all();
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        return wait_for_ctrl_c().await;
    };
    select! {
        reason = wait_for_ctrl_c() => reason,
        _ = terminate.recv() => "terminated",
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal support, never cancel
        std::future::pending::<()>().await;
    }
    "interrupted"
}
