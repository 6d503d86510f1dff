//! Fixed names used to locate configuration and data files

pub const APP_DIR_NAME: &str = "repofetch";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Subdirectory of the data dir holding helper binaries and repository overrides
pub const TOOLS_DIR: &str = "tools";
pub const TOOLS_BIN_DIR: &str = "bin";
pub const LOGS_DIR: &str = "logs";

pub const DEFAULT_RPM_REPOS_FILE: &str = "DEFAULT_RPM_REPOS.json";
pub const DEFAULT_DEB_REPOS_FILE: &str = "DEFAULT_DEB_REPOS.json";

pub const DEFAULT_OUTPUT_DIR: &str = "downloads";
pub const DEFAULT_ARCH: &str = "x86_64";
