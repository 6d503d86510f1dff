//! Low-level chunked streaming into the destination file

use repofetch_errors::{DeliveryError, Error};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Why a body stream stopped early
#[derive(Debug)]
pub(super) enum StreamFailure {
    Read(String),
    Write(String),
    Stalled(Duration),
    Cancelled,
}

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "stream read failed: {e}"),
            Self::Write(e) => write!(f, "write failed: {e}"),
            Self::Stalled(d) => write!(f, "no data received for {}s", d.as_secs()),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Copy `reader` into `writer` through a `chunk_size` buffer
///
/// Every chunk is written and flushed before the next read, so bytes
/// counted in `written` are on disk even when the stream fails.
pub(super) async fn stream_to_file<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    chunk_timeout: Duration,
    cancel: &CancellationToken,
    written: &mut u64,
) -> Result<(), StreamFailure>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamFailure::Cancelled),
            read = tokio::time::timeout(chunk_timeout, reader.read(&mut buffer)) => read,
        };

        let n = match read {
            Err(_) => return Err(StreamFailure::Stalled(chunk_timeout)),
            Ok(Err(e)) => return Err(StreamFailure::Read(e.to_string())),
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
        };

        writer
            .write_all(&buffer[..n])
            .await
            .map_err(|e| StreamFailure::Write(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| StreamFailure::Write(e.to_string()))?;
        *written += n as u64;
    }

    Ok(())
}

/// RAII claim on a destination path - ensures one writer per file
pub(super) struct InFlightGuard {
    path: PathBuf,
    claims: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightGuard {
    pub(super) fn acquire(
        claims: &Arc<Mutex<HashSet<PathBuf>>>,
        path: &Path,
    ) -> Result<Self, Error> {
        let mut set = claims.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(path.to_path_buf()) {
            return Err(DeliveryError::DuplicateDestination {
                path: path.display().to_string(),
            }
            .into());
        }
        Ok(Self {
            path: path.to_path_buf(),
            claims: Arc::clone(claims),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio_util::io::StreamReader;

    #[tokio::test]
    async fn writes_everything_in_chunks() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let mut reader = StreamReader::new(futures::stream::iter(chunks));
        let mut out = Vec::new();
        let mut written = 0;

        stream_to_file(
            &mut reader,
            &mut out,
            4,
            Duration::from_secs(5),
            &CancellationToken::new(),
            &mut written,
        )
        .await
        .unwrap();

        assert_eq!(out, b"hello world");
        assert_eq!(written, 11);
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"first-part")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
        ];
        let mut reader = StreamReader::new(futures::stream::iter(chunks));
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        let mut written = 0;

        let err = stream_to_file(
            &mut reader,
            &mut file,
            1024,
            Duration::from_secs(5),
            &CancellationToken::new(),
            &mut written,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StreamFailure::Read(_)));
        assert_eq!(written, 10);
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"first-part");
    }

    #[tokio::test]
    async fn cancelled_token_stops_stream() {
        let token = CancellationToken::new();
        token.cancel();
        let chunks: Vec<std::io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"data"))];
        let mut reader = StreamReader::new(futures::stream::iter(chunks));
        let mut out = Vec::new();
        let mut written = 0;

        let err = stream_to_file(
            &mut reader,
            &mut out,
            8,
            Duration::from_secs(5),
            &token,
            &mut written,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StreamFailure::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn second_claim_on_same_path_fails() {
        let claims = Arc::new(Mutex::new(HashSet::new()));
        let path = Path::new("/tmp/out/a.deb");
        let guard = InFlightGuard::acquire(&claims, path).unwrap();
        assert!(InFlightGuard::acquire(&claims, path).is_err());
        drop(guard);
        assert!(InFlightGuard::acquire(&claims, path).is_ok());
    }
}
