#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository metadata acquisition for repofetch
//!
//! Fetches Debian `Packages.gz` indexes and RPM `repomd.xml`/primary
//! metadata, picks a decompression codec per blob and yields normalized
//! records (Debian) or decompressed primary XML (RPM) for the resolver.

pub mod codec;
pub mod deb;
pub mod rpm;

pub use codec::{decompress, Compression};
pub use deb::{
    parse_control_paragraphs, parse_depends, records_from_paragraphs, repo_base_url,
    ControlParagraph, DebIndex, DebRepositoryClient,
};
pub use rpm::{parse_repomd, RepoPrimary, RpmRepositoryClient};

use futures::stream::{self, StreamExt};
use repofetch_errors::Error;
use repofetch_events::{AppEvent, EventEmitter, FailureContext, RepoEvent};
use repofetch_types::{Ecosystem, FailurePolicy, RepositoryFailure};
use std::future::Future;

/// Per-repository results in listed order
pub(crate) struct Collected<T> {
    pub values: Vec<T>,
    pub failures: Vec<RepositoryFailure>,
}

/// Run `fetch` for every URL with bounded concurrency, preserving order
///
/// Cancellation always aborts. Other failures abort under
/// [`FailurePolicy::FailFast`] and are recorded under
/// [`FailurePolicy::Continue`].
pub(crate) async fn fetch_ordered<T, F, Fut>(
    events: &impl EventEmitter,
    ecosystem: Ecosystem,
    urls: &[String],
    parallelism: usize,
    policy: FailurePolicy,
    fetch: F,
) -> Result<Collected<T>, Error>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut results = stream::iter(urls.iter().cloned())
        .map(|url| {
            let pending = fetch(url.clone());
            async move { (url, pending.await) }
        })
        .buffered(parallelism.max(1));

    let mut collected = Collected {
        values: Vec::with_capacity(urls.len()),
        failures: Vec::new(),
    };

    while let Some((url, result)) = results.next().await {
        match result {
            Ok(value) => collected.values.push(value),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                events.emit(AppEvent::Repo(RepoEvent::FetchFailed {
                    ecosystem,
                    url: url.clone(),
                    failure: FailureContext::from_error(&e),
                }));
                match policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Continue => collected.failures.push(RepositoryFailure {
                        ecosystem,
                        url,
                        error: e.to_string(),
                    }),
                }
            }
        }
    }

    Ok(collected)
}
