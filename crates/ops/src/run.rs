//! Resolve-and-deliver runs

use crate::{OpsCtx, RunRequest};
use repofetch_errors::{Error, OpsError};
use repofetch_events::{AppEvent, DownloadEvent, EventEmitter, FailureContext, ResolverEvent};
use repofetch_net::DeliveryTarget;
use repofetch_repository::{DebRepositoryClient, RpmRepositoryClient};
use repofetch_resolver::{resolve_closure, MetadataPool, SolvedPackage};
use repofetch_types::{
    DeliveryReport, Ecosystem, PlannedDelivery, ResolvedPackage, RunReport, SkippedDelivery,
};
use std::time::Instant;

/// Resolve the requested packages in every enabled ecosystem and deliver them
///
/// RPM runs first, then Debian. Per-artifact delivery failures are recorded
/// in the report rather than returned.
///
/// # Errors
///
/// Returns `OpsError::NoPackagesSpecified` for an empty request, the first
/// repository error under the fail-fast policy, solver errors, and
/// `Error::Cancelled` when the run is cancelled.
pub async fn run(ctx: &OpsCtx, request: RunRequest) -> Result<RunReport, Error> {
    if request.packages.is_empty() {
        return Err(OpsError::NoPackagesSpecified.into());
    }

    ctx.emit_operation_started("run");

    tokio::fs::create_dir_all(&request.output_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, &request.output_dir))?;

    let mut report = RunReport::default();

    let result = async {
        if request.use_rpm {
            run_ecosystem(ctx, &request, &mut report, Ecosystem::Rpm).await?;
        }
        if request.use_deb {
            run_ecosystem(ctx, &request, &mut report, Ecosystem::Deb).await?;
        }
        Ok::<(), Error>(())
    }
    .await;

    match result {
        Ok(()) => {
            ctx.emit_operation_completed("run", report.failed_deliveries() == 0);
            Ok(report)
        }
        Err(e) => {
            ctx.emit_operation_failed("run", &e);
            Err(e)
        }
    }
}

async fn run_ecosystem(
    ctx: &OpsCtx,
    request: &RunRequest,
    report: &mut RunReport,
    ecosystem: Ecosystem,
) -> Result<(), Error> {
    let start = Instant::now();
    ctx.emit(AppEvent::Resolver(ResolverEvent::ResolutionStarted {
        ecosystem,
        requested: request.packages.clone(),
    }));

    let resolved = match ecosystem {
        Ecosystem::Rpm => resolve_rpm(ctx, request, report).await,
        Ecosystem::Deb => resolve_deb(ctx, request, report).await,
    };
    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            ctx.emit(AppEvent::Resolver(ResolverEvent::ResolutionFailed {
                ecosystem,
                failure: FailureContext::from_error(&e),
            }));
            return Err(e);
        }
    };

    ctx.emit(AppEvent::Resolver(ResolverEvent::ResolutionCompleted {
        ecosystem,
        total_packages: resolved.as_ref().map_or(0, Vec::len),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }));

    // Probe runs resolve nothing and deliver nothing
    let Some(resolved) = resolved else {
        report.resolved.insert(ecosystem, Vec::new());
        return Ok(());
    };

    let deliveries = deliver_resolved(ctx, request, ecosystem, &resolved).await?;
    report.resolved.insert(ecosystem, resolved);
    report.deliveries.insert(ecosystem, deliveries);
    Ok(())
}

fn ensure_repositories(urls: &[String], ecosystem: Ecosystem) -> Result<(), Error> {
    if urls.is_empty() {
        return Err(OpsError::NoRepositories {
            ecosystem: ecosystem.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Solve (or probe) against every RPM repository
///
/// Returns `None` for a probe run.
async fn resolve_rpm(
    ctx: &OpsCtx,
    request: &RunRequest,
    report: &mut RunReport,
) -> Result<Option<Vec<ResolvedPackage>>, Error> {
    ensure_repositories(&request.rpm_repos, Ecosystem::Rpm)?;

    let client = RpmRepositoryClient::new(ctx.net.clone()).with_events(ctx.tx.clone());
    let (primaries, failures) = client
        .collect(&request.rpm_repos, request.parallelism, request.policy)
        .await?;
    report.repository_failures.extend(failures);

    let pool = MetadataPool::from_primaries(primaries, request.arch.clone());
    ctx.emit_debug(format!(
        "solving {} package(s) with the {} solver over {} repositories",
        request.packages.len(),
        ctx.solver.name(),
        pool.sources.len()
    ));

    if request.rpm_probe {
        let probes = ctx.solver.probe(&pool, &request.packages).await?;
        for (name, candidates) in &probes {
            ctx.emit(AppEvent::Resolver(ResolverEvent::ProbeCompleted {
                name: name.clone(),
                candidates: candidates.len(),
            }));
        }
        report.probes.extend(probes);
        return Ok(None);
    }

    let solved = ctx.solver.solve(&pool, &request.packages).await?;
    Ok(Some(solved.iter().map(SolvedPackage::to_resolved).collect()))
}

async fn resolve_deb(
    ctx: &OpsCtx,
    request: &RunRequest,
    report: &mut RunReport,
) -> Result<Option<Vec<ResolvedPackage>>, Error> {
    ensure_repositories(&request.deb_repos, Ecosystem::Deb)?;

    let client = DebRepositoryClient::new(ctx.net.clone()).with_events(ctx.tx.clone());
    let (index, failures) = client
        .collect(&request.deb_repos, request.parallelism, request.policy)
        .await?;
    report.repository_failures.extend(failures);

    let closure = resolve_closure(&request.packages, &index);
    for name in &closure.unknown {
        ctx.emit(AppEvent::Resolver(ResolverEvent::UnknownDependency {
            ecosystem: Ecosystem::Deb,
            name: name.clone(),
        }));
    }
    Ok(Some(closure.resolved))
}

/// Deliver or plan every resolved package
///
/// Packages without an artifact location are skipped.
async fn deliver_resolved(
    ctx: &OpsCtx,
    request: &RunRequest,
    ecosystem: Ecosystem,
    packages: &[ResolvedPackage],
) -> Result<DeliveryReport, Error> {
    let mut report = DeliveryReport::default();
    let mut targets = Vec::new();

    for package in packages {
        let (Some(url), Some(filename)) = (&package.download_url, &package.local_filename) else {
            ctx.emit(AppEvent::Resolver(ResolverEvent::MissingArtifact {
                ecosystem,
                name: package.name.clone(),
            }));
            report.skipped.push(SkippedDelivery {
                name: package.name.clone(),
                reason: "no artifact location in repository metadata".to_string(),
            });
            continue;
        };

        let Some(destination) = request.destination_for(filename) else {
            let reason = format!("artifact file name {filename:?} is not a plain file name");
            ctx.emit(AppEvent::Download(DownloadEvent::Skipped {
                package: package.name.clone(),
                reason: reason.clone(),
            }));
            report.skipped.push(SkippedDelivery {
                name: package.name.clone(),
                reason,
            });
            continue;
        };
        if request.dry_run {
            ctx.emit(AppEvent::Download(DownloadEvent::Planned {
                package: package.name.clone(),
                url: url.clone(),
                destination: destination.clone(),
            }));
            report.planned.push(PlannedDelivery {
                name: package.name.clone(),
                url: url.clone(),
                destination,
            });
        } else {
            targets.push(DeliveryTarget {
                name: package.name.clone(),
                url: url.clone(),
                destination,
            });
        }
    }

    if !targets.is_empty() {
        let batch = ctx
            .downloader
            .deliver_batch(targets, request.parallelism)
            .await?;
        report.delivered = batch.delivered;
        report.failed = batch.failed;
        report.skipped.extend(batch.skipped);
    }

    Ok(report)
}
