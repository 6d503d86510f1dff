//! Resumable artifact delivery
//!
//! Each artifact is fetched in whole-transfer attempts. A partial file on
//! disk is the only resume checkpoint: the next attempt asks for the
//! remaining bytes with a `Range` request and appends them.

mod config;
mod core;
mod resume;
mod stream;

pub use config::{DeliveryConfig, DeliveryOutcome, DeliveryTarget, TransferState};
pub use core::ArtifactDownloader;
