//! RPM repodata acquisition

use crate::codec;
use crate::fetch_ordered;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use repofetch_errors::{Error, MetadataError};
use repofetch_events::{AppEvent, EventEmitter, EventSender, RepoEvent};
use repofetch_net::{ensure_trailing_slash, fetch_bytes, join_url, response_bytes, NetClient};
use repofetch_types::{Ecosystem, FailurePolicy, RepositoryFailure};

/// Decompressed primary metadata of one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPrimary {
    /// Effective repository URL, after any `os/` fallback
    pub repository: String,
    /// Location of the primary blob relative to `repository`
    pub href: String,
    pub primary_xml: Vec<u8>,
}

/// Client for `repomd`-style RPM repositories
#[derive(Clone)]
pub struct RpmRepositoryClient {
    client: NetClient,
    tx: Option<EventSender>,
}

impl EventEmitter for RpmRepositoryClient {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl RpmRepositoryClient {
    #[must_use]
    pub fn new(client: NetClient) -> Self {
        Self { client, tx: None }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Fetch `repomd.xml` and the primary metadata it points at
    ///
    /// A 404 under a trailing `os/` segment is retried once against the
    /// parent URL, which then becomes the repository URL.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::HttpError` for a non-2xx `repomd.xml`,
    /// `MetadataError::PrimaryNotFound` when it has no primary entry and the
    /// codec errors of [`codec::decompress`].
    pub async fn fetch_repodata(&self, url: &str) -> Result<RepoPrimary, Error> {
        let mut repository = ensure_trailing_slash(url);
        let mut repomd_url = format!("{repository}repodata/repomd.xml");
        let mut response = self.client.get(&repomd_url).await?;

        if response.status().as_u16() == 404 && repository.trim_end_matches('/').ends_with("/os") {
            let fallback = repository[..repository.len() - "os/".len()].to_string();
            self.emit(AppEvent::Repo(RepoEvent::FallbackApplied {
                from_url: repository.clone(),
                to_url: fallback.clone(),
            }));
            repomd_url = format!("{fallback}repodata/repomd.xml");
            response = self.client.get(&repomd_url).await?;
            if response.status().is_success() {
                repository = fallback;
            }
        }

        let repomd = response_bytes(response, &repomd_url).await?;
        let href = parse_repomd(&repomd, &repository)?;
        self.emit(AppEvent::Repo(RepoEvent::PrimaryLocated {
            repository: repository.clone(),
            href: href.clone(),
        }));

        let primary_url = join_url(&repository, &href);
        let blob = fetch_bytes(&self.client, &primary_url).await?;
        let primary_xml = codec::decompress(&href, &blob).await?;

        Ok(RepoPrimary {
            repository,
            href,
            primary_xml,
        })
    }

    /// Fetch primary metadata for several repositories, in listed order
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
    ) -> Result<(Vec<RepoPrimary>, Vec<RepositoryFailure>), Error> {
        let results = fetch_ordered(
            self,
            Ecosystem::Rpm,
            urls,
            parallelism,
            policy,
            |url| async move {
                self.emit(AppEvent::Repo(RepoEvent::FetchStarted {
                    ecosystem: Ecosystem::Rpm,
                    url: url.clone(),
                }));
                let primary = self.fetch_repodata(&url).await?;
                self.emit(AppEvent::Repo(RepoEvent::FetchCompleted {
                    ecosystem: Ecosystem::Rpm,
                    url,
                    bytes: primary.primary_xml.len(),
                    packages: None,
                }));
                Ok(primary)
            },
        )
        .await?;

        Ok((results.values, results.failures))
    }
}

/// Find the primary metadata location in a `repomd.xml` document
///
/// # Errors
///
/// Returns `MetadataError::InvalidXml` for malformed XML and
/// `MetadataError::PrimaryNotFound` naming `repo_url` when no
/// `<data type="primary">` entry carries a location.
pub fn parse_repomd(xml: &[u8], repo_url: &str) -> Result<String, Error> {
    let mut reader = Reader::from_reader(xml);
    let invalid = |message: String| MetadataError::InvalidXml {
        url: format!("{repo_url}repodata/repomd.xml"),
        message,
    };

    let mut in_primary = false;
    loop {
        match reader.read_event().map_err(|e| invalid(e.to_string()))? {
            Event::Start(e) if e.local_name().as_ref() == b"data" => {
                in_primary = attribute(&e, b"type")
                    .map_err(invalid)?
                    .is_some_and(|t| t == "primary");
            }
            Event::End(e) if e.local_name().as_ref() == b"data" => in_primary = false,
            Event::Start(e) | Event::Empty(e)
                if in_primary && e.local_name().as_ref() == b"location" =>
            {
                if let Some(href) = attribute(&e, b"href").map_err(invalid)? {
                    return Ok(href);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(MetadataError::PrimaryNotFound {
        repo_url: repo_url.to_string(),
    }
    .into())
}

/// Unescaped value of the attribute with local name `key`
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1700000000</revision>
  <data type="filelists">
    <location href="repodata/abc-filelists.xml.gz"/>
  </data>
  <data type="primary">
    <checksum type="sha256">abc</checksum>
    <location href="repodata/def-primary.xml.gz"/>
  </data>
</repomd>"#;

    #[test]
    fn test_parse_repomd_primary() {
        let href = parse_repomd(REPOMD.as_bytes(), "http://x/").unwrap();
        assert_eq!(href, "repodata/def-primary.xml.gz");
    }

    #[test]
    fn test_parse_repomd_without_primary() {
        let xml = r#"<repomd><data type="other"><location href="o.xml.gz"/></data></repomd>"#;
        match parse_repomd(xml.as_bytes(), "http://x/BaseOS/") {
            Err(Error::Metadata(MetadataError::PrimaryNotFound { repo_url })) => {
                assert_eq!(repo_url, "http://x/BaseOS/");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_repomd_malformed() {
        let xml = r#"<repomd><data type="primary"></repomd>"#;
        assert!(matches!(
            parse_repomd(xml.as_bytes(), "http://x/"),
            Err(Error::Metadata(MetadataError::InvalidXml { .. }))
        ));
    }
}
