//! Compression codec dispatch for repository metadata

use async_compression::tokio::bufread::{GzipDecoder, XzDecoder};
use repofetch_errors::{Error, MetadataError};
use tokio::io::AsyncReadExt;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Compression formats used by repository indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Choose a codec from the file extension of `name`
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::UnsupportedCompression` naming the extension
    /// when it is not `.gz`, `.xz` or `.zst`.
    pub fn from_path(name: &str) -> Result<Self, MetadataError> {
        let extension = extension_of(name).unwrap_or_default();
        match extension.as_str() {
            "gz" => Ok(Self::Gzip),
            "xz" => Ok(Self::Xz),
            "zst" => Ok(Self::Zstd),
            _ => Err(MetadataError::UnsupportedCompression {
                extension,
                source_name: name.to_string(),
            }),
        }
    }

    /// Detect the codec from leading magic bytes
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if data.starts_with(XZ_MAGIC) {
            Some(Self::Xz)
        } else if data.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }

    /// Whether this build can decode the codec
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Gzip | Self::Xz => true,
            Self::Zstd => cfg!(feature = "zstd"),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Decompress `data` fully into memory
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::DecompressionFailed` for corrupt or truncated
    /// input and `MetadataError::MissingDecompressor` when zstd support was
    /// not compiled in.
    pub async fn decode(self, data: &[u8], source_name: &str) -> Result<Vec<u8>, Error> {
        require_capability(self, self.is_available(), source_name)?;

        let mut out = Vec::new();
        let result = match self {
            Self::Gzip => {
                let mut decoder = GzipDecoder::new(data);
                decoder.multiple_members(true);
                decoder.read_to_end(&mut out).await
            }
            Self::Xz => XzDecoder::new(data).read_to_end(&mut out).await,
            Self::Zstd => decode_zstd(data, &mut out).await,
        };

        result.map_err(|e| MetadataError::DecompressionFailed {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(out)
    }
}

/// Fail with `MissingDecompressor` when `codec` is not `available`
fn require_capability(
    codec: Compression,
    available: bool,
    source_name: &str,
) -> Result<(), MetadataError> {
    if available {
        return Ok(());
    }
    Err(MetadataError::MissingDecompressor {
        codec: codec.as_str().to_string(),
        requirement: format!("the `{}` feature of repofetch-repository", codec.as_str()),
        source_name: source_name.to_string(),
    })
}

#[cfg(feature = "zstd")]
async fn decode_zstd(data: &[u8], out: &mut Vec<u8>) -> std::io::Result<usize> {
    use async_compression::tokio::bufread::ZstdDecoder;
    ZstdDecoder::new(data).read_to_end(out).await
}

#[cfg(not(feature = "zstd"))]
#[allow(clippy::unused_async)]
async fn decode_zstd(_data: &[u8], _out: &mut Vec<u8>) -> std::io::Result<usize> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "zstd support not compiled in",
    ))
}

/// Decompress a metadata blob named `source_name`
///
/// The codec comes from the extension; names without one fall back to
/// magic-byte detection.
///
/// # Errors
///
/// Returns the errors of [`Compression::from_path`] and
/// [`Compression::decode`].
pub async fn decompress(source_name: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let codec = match extension_of(source_name) {
        Some(_) => Compression::from_path(source_name)?,
        None => Compression::sniff(data).ok_or_else(|| MetadataError::UnsupportedCompression {
            extension: String::new(),
            source_name: source_name.to_string(),
        })?,
    };
    codec.decode(data, source_name).await
}

/// Lowercased extension of the final path segment
fn extension_of(name: &str) -> Option<String> {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::{GzipEncoder, XzEncoder};

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzipEncoder::new(data).read_to_end(&mut out).await.unwrap();
        out
    }

    #[test]
    fn test_from_path_dispatch() {
        assert_eq!(
            Compression::from_path("repodata/abc-primary.xml.gz").unwrap(),
            Compression::Gzip
        );
        assert_eq!(
            Compression::from_path("repodata/abc-primary.xml.XZ").unwrap(),
            Compression::Xz
        );
        assert_eq!(
            Compression::from_path("repodata/abc-primary.xml.zst").unwrap(),
            Compression::Zstd
        );
    }

    #[test]
    fn test_unsupported_extension_is_named() {
        match Compression::from_path("repodata/abc-primary.xml.bz2") {
            Err(MetadataError::UnsupportedCompression {
                extension,
                source_name,
            }) => {
                assert_eq!(extension, "bz2");
                assert_eq!(source_name, "repodata/abc-primary.xml.bz2");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Compression::sniff(&[0x1f, 0x8b, 8]), Some(Compression::Gzip));
        assert_eq!(Compression::sniff(XZ_MAGIC), Some(Compression::Xz));
        assert_eq!(Compression::sniff(ZSTD_MAGIC), Some(Compression::Zstd));
        assert_eq!(Compression::sniff(b"<?xml"), None);
    }

    #[tokio::test]
    async fn test_gzip_multi_member() {
        let mut data = gzip(b"first ").await;
        data.extend(gzip(b"second").await);

        let out = decompress("Packages.gz", &data).await.unwrap();
        assert_eq!(out, b"first second");
    }

    #[tokio::test]
    async fn test_xz_decode() {
        let mut data = Vec::new();
        XzEncoder::new(&b"<metadata/>"[..])
            .read_to_end(&mut data)
            .await
            .unwrap();

        let out = decompress("primary.xml.xz", &data).await.unwrap();
        assert_eq!(out, b"<metadata/>");
    }

    #[tokio::test]
    async fn test_sniff_fallback_without_extension() {
        let data = gzip(b"payload").await;
        let out = decompress("repodata/primary", &data).await.unwrap();
        assert_eq!(out, b"payload");

        assert!(matches!(
            decompress("repodata/primary", b"plain").await,
            Err(Error::Metadata(MetadataError::UnsupportedCompression { .. }))
        ));
    }

    #[tokio::test]
    async fn test_truncated_input_fails() {
        let data = gzip(b"some longer payload to truncate").await;
        let err = decompress("Packages.gz", &data[..data.len() / 2])
            .await
            .unwrap_err();
        match err {
            Error::Metadata(MetadataError::DecompressionFailed { source_name, .. }) => {
                assert_eq!(source_name, "Packages.gz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_capability_is_named() {
        assert!(require_capability(Compression::Zstd, true, "primary.xml.zst").is_ok());
        match require_capability(Compression::Zstd, false, "primary.xml.zst") {
            Err(MetadataError::MissingDecompressor {
                codec,
                requirement,
                source_name,
            }) => {
                assert_eq!(codec, "zstd");
                assert!(requirement.contains("`zstd` feature"));
                assert_eq!(source_name, "primary.xml.zst");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(Compression::Gzip.is_available());
        assert_eq!(Compression::Zstd.is_available(), cfg!(feature = "zstd"));
    }

    #[cfg(feature = "zstd")]
    #[tokio::test]
    async fn test_zstd_decode() {
        use async_compression::tokio::bufread::ZstdEncoder;
        let mut data = Vec::new();
        ZstdEncoder::new(&b"zstd body"[..])
            .read_to_end(&mut data)
            .await
            .unwrap();

        let out = decompress("primary.xml.zst", &data).await.unwrap();
        assert_eq!(out, b"zstd body");
    }

    #[cfg(not(feature = "zstd"))]
    #[tokio::test]
    async fn test_zstd_without_capability() {
        let err = decompress("primary.xml.zst", ZSTD_MAGIC).await.unwrap_err();
        match err {
            Error::Metadata(MetadataError::MissingDecompressor { codec, .. }) => {
                assert_eq!(codec, "zstd");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
