//! Tracing setup and structured logging of application events
//!
//! Library crates only emit [`AppEvent`]s; this module turns them into
//! `tracing` records with structured fields.

use repofetch_events::{
    AppEvent, DownloadEvent, GeneralEvent, ProcessEvent, RepoEvent, ResolverEvent,
};
use std::path::Path;
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging
///
/// Debug mode writes JSON records to `<logs_dir>/repofetch-<timestamp>.log`.
/// JSON output mode keeps stderr silent unless debug logging goes to a file.
pub fn init_tracing(json_mode: bool, debug_enabled_flag: bool, logs_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        match open_log_file(logs_dir) {
            Ok((file, path)) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(env_filter("info,repofetch=debug,repofetch_ops=debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", path.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // Keep stdout clean for the JSON report
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter(env_filter("warn,repofetch=info"))
            .init();
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn open_log_file(logs_dir: &Path) -> std::io::Result<(std::fs::File, std::path::PathBuf)> {
    std::fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(format!(
        "repofetch-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));
    let file = std::fs::File::create(&path)?;
    Ok((file, path))
}

/// Log an `AppEvent` using the tracing infrastructure with structured fields
#[allow(clippy::too_many_lines)]
pub fn log_event_with_tracing(event: &AppEvent) {
    let domain = event.log_target();
    match event {
        AppEvent::Repo(repo_event) => match repo_event {
            RepoEvent::FetchStarted { ecosystem, url } => {
                info!(domain, ecosystem = %ecosystem, url = %url, "Fetching repository metadata");
            }
            RepoEvent::FallbackApplied { from_url, to_url } => {
                info!(domain, from = %from_url, to = %to_url, "Retrying repository without os/ suffix");
            }
            RepoEvent::PrimaryLocated { repository, href } => {
                debug!(domain, repository = %repository, href = %href, "Primary metadata located");
            }
            RepoEvent::FetchCompleted {
                ecosystem,
                url,
                bytes,
                packages,
            } => {
                info!(
                    domain,
                    ecosystem = %ecosystem,
                    url = %url,
                    bytes = bytes,
                    packages = ?packages,
                    "Repository metadata fetched"
                );
            }
            RepoEvent::FetchFailed {
                ecosystem,
                url,
                failure,
            } => {
                error!(
                    domain,
                    ecosystem = %ecosystem,
                    url = %url,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Repository fetch failed"
                );
            }
            RepoEvent::DuplicateIgnored {
                name,
                kept_from,
                ignored_from,
            } => {
                debug!(
                    domain,
                    package = %name,
                    kept_from = %kept_from,
                    ignored_from = %ignored_from,
                    "Duplicate package ignored"
                );
            }
        },

        AppEvent::Resolver(resolver_event) => match resolver_event {
            ResolverEvent::ResolutionStarted {
                ecosystem,
                requested,
            } => {
                info!(domain, ecosystem = %ecosystem, requested = ?requested, "Resolution started");
            }
            ResolverEvent::UnknownDependency { ecosystem, name } => {
                debug!(domain, ecosystem = %ecosystem, package = %name, "Dependency not in any index");
            }
            ResolverEvent::MissingArtifact { ecosystem, name } => {
                warn!(domain, ecosystem = %ecosystem, package = %name, "Package has no artifact location");
            }
            ResolverEvent::ResolutionCompleted {
                ecosystem,
                total_packages,
                duration_ms,
            } => {
                info!(
                    domain,
                    ecosystem = %ecosystem,
                    total_packages = total_packages,
                    duration_ms = duration_ms,
                    "Resolution completed"
                );
            }
            ResolverEvent::ResolutionFailed { ecosystem, failure } => {
                error!(
                    domain,
                    ecosystem = %ecosystem,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Resolution failed"
                );
            }
            ResolverEvent::ProbeCompleted { name, candidates } => {
                info!(domain, package = %name, candidates = candidates, "Probe completed");
            }
        },

        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::Planned {
                package,
                url,
                destination,
            } => {
                info!(
                    domain,
                    package = %package,
                    url = %url,
                    destination = %destination.display(),
                    "Download planned"
                );
            }
            DownloadEvent::Started {
                url,
                package,
                resume_offset,
                attempt,
                ..
            } => {
                debug!(
                    domain,
                    url = %url,
                    package = ?package,
                    resume_offset = resume_offset,
                    attempt = attempt,
                    "Download started"
                );
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                max_attempts,
                reason,
                backoff_delay,
            } => {
                warn!(
                    domain,
                    url = %url,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    reason = %reason,
                    backoff_ms = u64::try_from(backoff_delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying download"
                );
            }
            DownloadEvent::Completed {
                url,
                package,
                bytes_written,
                final_size,
                ..
            } => {
                info!(
                    domain,
                    url = %url,
                    package = ?package,
                    bytes_written = bytes_written,
                    final_size = final_size,
                    "Download completed"
                );
            }
            DownloadEvent::Failed {
                url,
                package,
                destination,
                failure,
            } => {
                error!(
                    domain,
                    url = %url,
                    package = ?package,
                    destination = %destination.display(),
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    "Download failed"
                );
            }
            _ => log_at_level(event),
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(domain, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(domain, details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(domain, context = ?context, "{message}");
            }
            GeneralEvent::OperationFailed { operation, failure } => {
                error!(
                    domain,
                    operation = %operation,
                    code = ?failure.code,
                    message = %failure.message,
                    "Operation failed"
                );
            }
            _ => log_at_level(event),
        },

        AppEvent::Process(ProcessEvent::Spawned { helper, command }) => {
            debug!(domain, helper = %helper, command = %command, "Helper spawned");
        }
        AppEvent::Process(_) => log_at_level(event),
    }
}

/// Fallback for events without dedicated fields
fn log_at_level(event: &AppEvent) {
    let domain = event.log_target();
    match event.log_level() {
        Level::ERROR => error!(domain, event = ?event, "Application event"),
        Level::WARN => warn!(domain, event = ?event, "Application event"),
        Level::INFO => info!(domain, event = ?event, "Application event"),
        Level::DEBUG => debug!(domain, event = ?event, "Application event"),
        _ => trace!(domain, event = ?event, "Application event"),
    }
}
