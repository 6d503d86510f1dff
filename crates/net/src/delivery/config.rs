//! Configuration structures for artifact delivery

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Configuration for artifact delivery
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Read buffer size; each chunk is written and flushed before the next read
    pub chunk_size: usize,
    /// Whole-transfer attempts per artifact
    pub max_attempts: u32,
    /// Timeout for individual chunks
    pub chunk_timeout: Duration,
    /// Maximum number of concurrent deliveries in a batch
    pub max_concurrent: usize,
    /// Backoff between attempts
    pub retry_config: RetryConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024, // 1MB
            max_attempts: 3,
            chunk_timeout: Duration::from_secs(60),
            max_concurrent: 4,
            retry_config: RetryConfig::default(),
        }
    }
}

impl DeliveryConfig {
    /// Build from the loaded configuration
    #[must_use]
    pub fn from_config(config: &repofetch_config::Config) -> Self {
        Self {
            chunk_size: config.delivery.chunk_size,
            max_attempts: config.delivery.max_attempts,
            chunk_timeout: Duration::from_secs(config.delivery.chunk_timeout),
            max_concurrent: config.general.parallel_downloads,
            retry_config: RetryConfig {
                max_retries: config.delivery.max_attempts.saturating_sub(1),
                initial_delay: Duration::from_millis(config.network.retry_delay_ms),
                max_delay: Duration::from_millis(config.network.max_delay_ms),
                backoff_multiplier: 2.0,
                jitter_factor: config.network.jitter_factor,
            },
        }
    }
}

/// One artifact to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
}

/// Per-artifact transfer bookkeeping
#[derive(Debug, Clone)]
pub struct TransferState {
    pub destination: PathBuf,
    /// Size of the partial file when the current attempt started
    pub bytes_already_present: u64,
    pub attempt_count: u32,
}

impl TransferState {
    pub(super) fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            bytes_already_present: 0,
            attempt_count: 0,
        }
    }
}

/// Result of a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub destination: PathBuf,
    /// Bytes written by the successful attempt
    pub bytes_written: u64,
    /// Offset the successful attempt resumed from
    pub resumed_from: u64,
    /// Server reported the range unsatisfiable, nothing was written
    pub already_complete: bool,
    pub attempts: u32,
    pub final_size: u64,
}
