//! Helper program lookup

use repofetch_errors::{Error, PlatformError};
use std::path::{Path, PathBuf};

/// Locate a helper program
///
/// Absolute or relative paths containing a separator are used as given.
/// Bare names are searched in `PATH`, then in each fallback directory.
///
/// # Errors
///
/// Returns `PlatformError::HelperNotFound` listing every place searched.
pub fn resolve_program(program: &str, fallback_dirs: &[PathBuf]) -> Result<PathBuf, Error> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }
        return Err(PlatformError::HelperNotFound {
            helper: program.to_string(),
            searched: as_path.display().to_string(),
        }
        .into());
    }

    if let Ok(found) = which::which(program) {
        return Ok(found);
    }

    for dir in fallback_dirs {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let mut searched = vec!["PATH".to_string()];
    searched.extend(fallback_dirs.iter().map(|d| d.display().to_string()));
    Err(PlatformError::HelperNotFound {
        helper: program.to_string(),
        searched: searched.join(", "),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let helper = dir.path().join("solve");
        std::fs::write(&helper, "#!/bin/sh\n").unwrap();

        let found = resolve_program(helper.to_str().unwrap(), &[]).unwrap();
        assert_eq!(found, helper);

        let missing = dir.path().join("absent");
        let err = resolve_program(missing.to_str().unwrap(), &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::HelperNotFound { .. })
        ));
    }

    #[test]
    fn falls_back_to_tools_dir() {
        let dir = tempfile::tempdir().unwrap();
        let name = "repofetch-test-helper-that-is-not-on-path";
        let helper = dir.path().join(name);
        std::fs::write(&helper, "").unwrap();

        let found = resolve_program(name, &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found, helper);
    }

    #[test]
    fn missing_helper_names_search_locations() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_program("repofetch-definitely-missing", &[dir.path().to_path_buf()])
            .unwrap_err();
        match err {
            Error::Platform(PlatformError::HelperNotFound { helper, searched }) => {
                assert_eq!(helper, "repofetch-definitely-missing");
                assert!(searched.starts_with("PATH"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
