//! Main delivery orchestration and `ArtifactDownloader` implementation

use super::config::{DeliveryConfig, DeliveryOutcome, DeliveryTarget, TransferState};
use super::resume::{get_resume_offset, open_destination, prepare_destination};
use super::stream::{stream_to_file, InFlightGuard, StreamFailure};
use crate::client::NetClient;
use crate::retry::calculate_backoff_delay;
use futures::stream::{FuturesUnordered, StreamExt};
use repofetch_config::{acquire_semaphore_permit, create_semaphore};
use repofetch_errors::{DeliveryError, Error};
use repofetch_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use repofetch_types::{DeliveredArtifact, DeliveryReport, FailedDelivery, SkippedDelivery};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

/// How one attempt ended when it did not succeed
enum AttemptError {
    /// Stop immediately, no further attempts
    Terminal(Error),
    /// Try again after backoff
    Retryable(String),
}

/// A resumable artifact downloader
#[derive(Clone)]
pub struct ArtifactDownloader {
    client: NetClient,
    config: DeliveryConfig,
    tx: Option<EventSender>,
    cancel: CancellationToken,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl EventEmitter for ArtifactDownloader {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl ArtifactDownloader {
    /// Create a new downloader on top of a transport client
    #[must_use]
    pub fn new(client: NetClient, config: DeliveryConfig) -> Self {
        Self {
            client,
            config,
            tx: None,
            cancel: CancellationToken::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Stop transfers promptly once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Download `url` into `destination`, resuming any partial file
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Unwritable` if the destination cannot be
    /// created, `DeliveryError::AttemptsExhausted` after `max_attempts`
    /// failed attempts and `Error::Cancelled` on cancellation. Partial files
    /// are left in place in every case.
    pub async fn deliver(
        &self,
        url: &str,
        destination: &Path,
        chunk_size: usize,
        max_attempts: u32,
    ) -> Result<DeliveryOutcome, Error> {
        self.deliver_inner(None, url, destination, chunk_size, max_attempts)
            .await
    }

    /// Deliver a named target with the configured chunk size and attempts
    ///
    /// # Errors
    ///
    /// See [`ArtifactDownloader::deliver`].
    pub async fn deliver_target(&self, target: &DeliveryTarget) -> Result<DeliveryOutcome, Error> {
        self.deliver_inner(
            Some(&target.name),
            &target.url,
            &target.destination,
            self.config.chunk_size,
            self.config.max_attempts,
        )
        .await
    }

    /// Deliver many artifacts with bounded concurrency
    ///
    /// Per-artifact failures are collected in the report; only cancellation
    /// aborts the batch. A destination listed twice is delivered once.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if the run is cancelled.
    pub async fn deliver_batch(
        &self,
        targets: Vec<DeliveryTarget>,
        parallelism: usize,
    ) -> Result<DeliveryReport, Error> {
        let semaphore = create_semaphore(parallelism);
        let mut report = DeliveryReport::default();
        let mut owners: HashMap<PathBuf, String> = HashMap::new();
        let mut futures = FuturesUnordered::new();

        for target in targets {
            if let Some(owner) = owners.get(&target.destination) {
                let reason = format!(
                    "destination {} already targeted by {owner}",
                    target.destination.display()
                );
                self.emit(AppEvent::Download(DownloadEvent::Skipped {
                    package: target.name.clone(),
                    reason: reason.clone(),
                }));
                report.skipped.push(SkippedDelivery {
                    name: target.name,
                    reason,
                });
                continue;
            }
            owners.insert(target.destination.clone(), target.name.clone());

            let downloader = self.clone();
            let semaphore = semaphore.clone();
            futures.push(async move {
                let result = async {
                    let _permit = acquire_semaphore_permit(semaphore, "artifact delivery").await?;
                    downloader.deliver_target(&target).await
                }
                .await;
                (target, result)
            });
        }

        while let Some((target, result)) = futures.next().await {
            match result {
                Ok(outcome) => report.delivered.push(DeliveredArtifact {
                    name: target.name,
                    destination: outcome.destination,
                    bytes_written: outcome.bytes_written,
                    resumed_from: outcome.resumed_from,
                    already_complete: outcome.already_complete,
                    attempts: outcome.attempts,
                }),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => report.failed.push(FailedDelivery {
                    name: target.name,
                    url: target.url,
                    destination: target.destination,
                    error: e.to_string(),
                }),
            }
        }

        report.delivered.sort_by(|a, b| a.name.cmp(&b.name));
        report.failed.sort_by(|a, b| a.name.cmp(&b.name));

        self.emit(AppEvent::Download(DownloadEvent::BatchCompleted {
            delivered: report.delivered.len(),
            skipped: report.skipped.len(),
            failed: report.failed.len(),
        }));

        Ok(report)
    }

    async fn deliver_inner(
        &self,
        package: Option<&str>,
        url: &str,
        destination: &Path,
        chunk_size: usize,
        max_attempts: u32,
    ) -> Result<DeliveryOutcome, Error> {
        crate::parse_url(url)?;
        let _claim = InFlightGuard::acquire(&self.in_flight, destination)?;
        prepare_destination(destination).await?;

        let max_attempts = max_attempts.max(1);
        let mut state = TransferState::new(destination.to_path_buf());
        let mut last_error = String::new();

        while state.attempt_count < max_attempts {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            state.attempt_count += 1;

            match self.try_deliver(package, url, chunk_size, &mut state).await {
                Ok(outcome) => return Ok(outcome),
                Err(AttemptError::Terminal(e)) => return Err(e),
                Err(AttemptError::Retryable(message)) => {
                    last_error = message;
                }
            }

            if state.attempt_count < max_attempts {
                let delay =
                    calculate_backoff_delay(&self.config.retry_config, state.attempt_count);
                self.emit(AppEvent::Download(DownloadEvent::Retrying {
                    url: url.to_string(),
                    attempt: state.attempt_count,
                    max_attempts,
                    reason: last_error.clone(),
                    backoff_delay: delay,
                }));
                tokio::select! {
                    () = self.cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        let error = DeliveryError::AttemptsExhausted {
            url: url.to_string(),
            destination: destination.display().to_string(),
            attempts: state.attempt_count,
            last_error,
        };
        self.emit(AppEvent::Download(DownloadEvent::Failed {
            url: url.to_string(),
            package: package.map(str::to_string),
            destination: destination.to_path_buf(),
            failure: FailureContext::from_error(&error),
        }));
        Err(error.into())
    }

    /// Attempt a single transfer, resuming from the current file size
    async fn try_deliver(
        &self,
        package: Option<&str>,
        url: &str,
        chunk_size: usize,
        state: &mut TransferState,
    ) -> Result<DeliveryOutcome, AttemptError> {
        let destination = state.destination.clone();
        let offset = get_resume_offset(&destination).await;
        state.bytes_already_present = offset;

        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.to_string(),
            package: package.map(str::to_string),
            destination: destination.clone(),
            resume_offset: offset,
            attempt: state.attempt_count,
        }));

        let response = if offset > 0 {
            let range = format!("bytes={offset}-");
            self.client
                .get_with_headers(url, &[("Range", range.as_str())])
                .await
        } else {
            self.client.get(url).await
        }
        .map_err(|e| match e {
            Error::Cancelled => AttemptError::Terminal(e),
            other => AttemptError::Retryable(other.to_string()),
        })?;

        let status = response.status();
        let resumed_from = match (offset > 0, status) {
            (true, StatusCode::RANGE_NOT_SATISFIABLE) => {
                self.emit(AppEvent::Download(DownloadEvent::AlreadyComplete {
                    url: url.to_string(),
                    destination: destination.clone(),
                }));
                return Ok(DeliveryOutcome {
                    destination,
                    bytes_written: 0,
                    resumed_from: offset,
                    already_complete: true,
                    attempts: state.attempt_count,
                    final_size: offset,
                });
            }
            (true, StatusCode::PARTIAL_CONTENT) => offset,
            (true, StatusCode::OK) => {
                self.emit(AppEvent::Download(DownloadEvent::RangeIgnored {
                    url: url.to_string(),
                    discarded_bytes: offset,
                }));
                0
            }
            (false, s) if s.is_success() => 0,
            (_, s) => {
                return Err(AttemptError::Retryable(format!(
                    "HTTP {} for {url}",
                    s.as_u16()
                )))
            }
        };

        let mut file = open_destination(&destination, resumed_from > 0)
            .await
            .map_err(AttemptError::Terminal)?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut reader = StreamReader::new(Box::pin(body));
        let mut written = 0u64;

        let streamed = stream_to_file(
            &mut reader,
            &mut file,
            chunk_size,
            self.config.chunk_timeout,
            &self.cancel,
            &mut written,
        )
        .await;

        match streamed {
            Ok(()) => {}
            Err(StreamFailure::Cancelled) => return Err(AttemptError::Terminal(Error::Cancelled)),
            Err(failure) => {
                return Err(AttemptError::Retryable(format!(
                    "{failure} after {written} bytes from {url}"
                )))
            }
        }

        let final_size = resumed_from + written;
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.to_string(),
            package: package.map(str::to_string),
            destination: destination.clone(),
            bytes_written: written,
            final_size,
        }));

        Ok(DeliveryOutcome {
            destination,
            bytes_written: written,
            resumed_from,
            already_complete: false,
            attempts: state.attempt_count,
            final_size,
        })
    }
}
