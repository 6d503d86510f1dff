//! Debian flat repository indexes

use crate::codec::Compression;
use crate::fetch_ordered;
use repofetch_errors::Error;
use repofetch_events::{AppEvent, EventEmitter, EventSender, RepoEvent};
use repofetch_net::{ensure_trailing_slash, fetch_bytes, NetClient};
use repofetch_types::{Ecosystem, FailurePolicy, PackageRecord, RepositoryFailure};
use std::collections::HashMap;

/// One RFC822-style block of `Key: value` fields, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlParagraph {
    fields: Vec<(String, String)>,
}

impl ControlParagraph {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field; a repeated key replaces the value in its original position
    pub fn set(&mut self, key: String, value: String) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    fn append_continuation(&mut self, key: &str, text: &str) {
        if let Some((_, value)) = self.fields.iter_mut().find(|(k, _)| k == key) {
            value.push(' ');
            value.push_str(text);
        }
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Split control-file text into paragraphs
///
/// Paragraphs are separated by whitespace-only lines. A line starting with
/// whitespace continues the previous field.
#[must_use]
pub fn parse_control_paragraphs(text: &str) -> Vec<ControlParagraph> {
    let mut paragraphs = Vec::new();
    let mut paragraph = ControlParagraph::default();
    let mut current_key: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                paragraphs.push(std::mem::take(&mut paragraph));
            }
            current_key = None;
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(key) = &current_key {
                paragraph.append_continuation(key, line.trim());
                continue;
            }
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_string();
        paragraph.set(key.clone(), value.trim().to_string());
        current_key = Some(key);
    }

    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
    paragraphs
}

/// Reduce a `Depends` field to bare package names
///
/// Only the first alternative of `a | b` is kept and version constraints
/// are dropped.
#[must_use]
pub fn parse_depends(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter_map(|entry| {
            let first_alt = entry.split('|').next().unwrap_or_default();
            first_alt.split_whitespace().next().map(str::to_string)
        })
        .collect()
}

/// Repository root used to resolve `Filename` paths
///
/// Everything from the first `/dists/` on is removed.
#[must_use]
pub fn repo_base_url(url: &str) -> String {
    match url.find("/dists/") {
        Some(index) => ensure_trailing_slash(&url[..index]),
        None => ensure_trailing_slash(url),
    }
}

/// Turn paragraphs into records, skipping any without a `Package` field
#[must_use]
pub fn records_from_paragraphs(
    paragraphs: &[ControlParagraph],
    base_url: &str,
) -> Vec<PackageRecord> {
    paragraphs
        .iter()
        .filter_map(|paragraph| {
            let name = paragraph.get("Package").filter(|n| !n.is_empty())?;
            let mut record = PackageRecord::new(name, base_url)
                .with_depends(paragraph.get("Depends").map(parse_depends).unwrap_or_default());
            if let Some(filename) = paragraph.get("Filename") {
                record = record.with_artifact(filename);
            }
            Some(record)
        })
        .collect()
}

/// Name-keyed package records; the first record seen for a name wins
#[derive(Debug, Clone, Default)]
pub struct DebIndex {
    records: HashMap<String, PackageRecord>,
}

impl DebIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already known; returns whether it was added
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        if self.records.contains_key(&record.name) {
            return false;
        }
        self.records.insert(record.name.clone(), record);
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge records from one repository, reporting ignored duplicates
    pub fn merge(&mut self, records: Vec<PackageRecord>, events: &impl EventEmitter) {
        for record in records {
            if let Some(existing) = self.records.get(&record.name) {
                events.emit(AppEvent::Repo(RepoEvent::DuplicateIgnored {
                    name: record.name.clone(),
                    kept_from: existing.source_base_url.clone(),
                    ignored_from: record.source_base_url.clone(),
                }));
                continue;
            }
            self.insert(record);
        }
    }
}

/// Client for Debian flat repositories
#[derive(Clone)]
pub struct DebRepositoryClient {
    client: NetClient,
    tx: Option<EventSender>,
}

impl EventEmitter for DebRepositoryClient {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl DebRepositoryClient {
    #[must_use]
    pub fn new(client: NetClient) -> Self {
        Self { client, tx: None }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Download and decompress `<url>Packages.gz`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::HttpError` for a non-2xx response and
    /// `MetadataError::DecompressionFailed` for a corrupt archive.
    pub async fn fetch_packages(&self, url: &str) -> Result<String, Error> {
        let packages_url = format!("{}Packages.gz", ensure_trailing_slash(url));
        let data = fetch_bytes(&self.client, &packages_url).await?;
        let text = Compression::Gzip.decode(&data, &packages_url).await?;
        Ok(String::from_utf8_lossy(&text).into_owned())
    }

    /// Fetch and decode one repository into records
    ///
    /// # Errors
    ///
    /// See [`DebRepositoryClient::fetch_packages`].
    pub async fn fetch_records(&self, url: &str) -> Result<Vec<PackageRecord>, Error> {
        self.emit(AppEvent::Repo(RepoEvent::FetchStarted {
            ecosystem: Ecosystem::Deb,
            url: url.to_string(),
        }));

        let text = self.fetch_packages(url).await?;
        let paragraphs = parse_control_paragraphs(&text);
        let records = records_from_paragraphs(&paragraphs, &repo_base_url(url));

        self.emit(AppEvent::Repo(RepoEvent::FetchCompleted {
            ecosystem: Ecosystem::Deb,
            url: url.to_string(),
            bytes: text.len(),
            packages: Some(records.len()),
        }));
        Ok(records)
    }

    /// Build one index from several repositories
    ///
    /// Repositories are fetched concurrently and merged in listed order.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::FailFast`] the first failing repository in
    /// list order aborts the collection.
    pub async fn collect(
        &self,
        urls: &[String],
        parallelism: usize,
        policy: FailurePolicy,
    ) -> Result<(DebIndex, Vec<RepositoryFailure>), Error> {
        let results = fetch_ordered(
            self,
            Ecosystem::Deb,
            urls,
            parallelism,
            policy,
            |url| async move { self.fetch_records(&url).await },
        )
        .await?;

        let mut index = DebIndex::new();
        for records in results.values {
            index.merge(records, self);
        }
        Ok((index, results.failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_count_and_order() {
        let text = "Package: a\nVersion: 1\n\n\nPackage: b\n   \nPackage: c\n";
        let paragraphs = parse_control_paragraphs(text);
        let names: Vec<_> = paragraphs.iter().filter_map(|p| p.get("Package")).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_continuation_lines_fold() {
        let paragraphs = parse_control_paragraphs("Field: value\n extra text\n");
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].get("Field"), Some("value extra text"));
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let paragraphs = parse_control_paragraphs("garbage\nPackage: a\nmore garbage\n");
        assert_eq!(paragraphs[0].len(), 1);
        assert_eq!(paragraphs[0].get("Package"), Some("a"));
    }

    #[test]
    fn test_fields_keep_source_order() {
        let paragraphs = parse_control_paragraphs("Package: a\nDepends: b\nFilename: pool/a.deb\n");
        let keys: Vec<_> = paragraphs[0].iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Package", "Depends", "Filename"]);
    }

    #[test]
    fn test_parse_depends() {
        assert_eq!(parse_depends("a (>= 1.0), b | c, d"), vec!["a", "b", "d"]);
        assert!(parse_depends("").is_empty());
        assert_eq!(parse_depends("libc6:any, , x"), vec!["libc6:any", "x"]);
    }

    #[test]
    fn test_repo_base_url() {
        assert_eq!(repo_base_url("http://x/dists/stable/main/"), "http://x/");
        assert_eq!(repo_base_url("http://x/flat/"), "http://x/flat/");
        assert_eq!(repo_base_url("http://x/flat"), "http://x/flat/");
    }

    #[test]
    fn test_records_from_paragraphs() {
        let paragraphs = parse_control_paragraphs(
            "Package: a\nDepends: b (>= 2)\nFilename: pool/main/a.deb\n\nVersion: 1\n\nPackage: b\n",
        );
        let records = records_from_paragraphs(&paragraphs, "http://x/");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].depends, vec!["b"]);
        assert_eq!(records[0].artifact_path.as_deref(), Some("pool/main/a.deb"));
        assert_eq!(records[1].artifact_path, None);
        assert_eq!(records[1].source_base_url, "http://x/");
    }

    #[test]
    fn test_index_first_seen_wins() {
        let mut index = DebIndex::new();
        assert!(index.insert(PackageRecord::new("util", "http://first/")));
        assert!(!index.insert(PackageRecord::new("util", "http://second/")));
        assert_eq!(index.get("util").unwrap().source_base_url, "http://first/");
        assert_eq!(index.len(), 1);
    }
}
