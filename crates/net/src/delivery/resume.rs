//! Partial-file inspection and destination handling

use repofetch_errors::{DeliveryError, Error};
use std::path::Path;
use tokio::fs::{self as tokio_fs, File, OpenOptions};

/// Get the offset for resuming a download
///
/// Any existing file counts as a valid prefix; a missing file resumes from 0.
pub(super) async fn get_resume_offset(dest_path: &Path) -> u64 {
    match tokio_fs::metadata(dest_path).await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => 0,
    }
}

/// Create the parent directories of a destination
pub(super) async fn prepare_destination(dest_path: &Path) -> Result<(), Error> {
    if let Some(parent) = dest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio_fs::create_dir_all(parent)
            .await
            .map_err(|e| unwritable(parent, &e))?;
    }
    Ok(())
}

/// Open the destination for appending or truncating writes
pub(super) async fn open_destination(dest_path: &Path, append: bool) -> Result<File, Error> {
    let result = if append {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dest_path)
            .await
    } else {
        File::create(dest_path).await
    };
    result.map_err(|e| unwritable(dest_path, &e))
}

fn unwritable(path: &Path, err: &std::io::Error) -> Error {
    DeliveryError::Unwritable {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_resumes_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_resume_offset(&dir.path().join("a.deb")).await, 0);
    }

    #[tokio::test]
    async fn existing_file_size_is_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.deb");
        std::fs::write(&path, b"12345").unwrap();
        assert_eq!(get_resume_offset(&path).await, 5);
    }

    #[tokio::test]
    async fn directory_in_the_way_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        assert_eq!(get_resume_offset(&path).await, 0);
        let err = open_destination(&path, false).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Delivery(DeliveryError::Unwritable { .. })
        ));
    }

    #[tokio::test]
    async fn parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/a.rpm");
        prepare_destination(&path).await.unwrap();
        assert!(path.parent().unwrap().is_dir());
    }
}
