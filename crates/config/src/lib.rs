#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for repofetch
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/repofetch/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)
//!
//! Repository lists fall back to JSON override files in the data directory
//! and then to the built-in mirrors.

pub mod constants;
pub mod repository;
pub mod resources_semaphore;

pub use repository::{
    load_repository_list, RepositoryConfig, BUILTIN_DEB_REPOS, BUILTIN_RPM_REPOS,
};
pub use resources_semaphore::{acquire_semaphore_permit, create_semaphore};

use repofetch_errors::{ConfigError, Error};
use repofetch_types::{Ecosystem, OutputFormat, SolverKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub repositories: RepositoryConfig,

    #[serde(default)]
    pub rpm: RpmConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_parallel_downloads")]
    pub parallel_downloads: usize,
    #[serde(default)]
    pub default_output: OutputFormat,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds per read
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Artifact delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Longest wait for a single body chunk
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64, // seconds
}

/// RPM resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpmConfig {
    #[serde(default = "default_arch")]
    pub arch: String,
    #[serde(default)]
    pub solver: SolverKind,
    /// Program used when `solver = "command"`
    #[serde(default = "default_solver_command")]
    pub solver_command: String,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub data_dir: Option<PathBuf>,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            parallel_downloads: default_parallel_downloads(),
            default_output: OutputFormat::Table,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_attempts: default_max_attempts(),
            chunk_timeout: default_chunk_timeout(),
        }
    }
}

impl Default for RpmConfig {
    fn default() -> Self {
        Self {
            arch: default_arch(),
            solver: SolverKind::Native,
            solver_command: default_solver_command(),
        }
    }
}

// Default value functions for serde
fn default_output_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_OUTPUT_DIR)
}

fn default_parallel_downloads() -> usize {
    4
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_factor() -> f64 {
    0.1
}

fn default_user_agent() -> String {
    format!("repofetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_chunk_timeout() -> u64 {
    60
}

fn default_arch() -> String {
    constants::DEFAULT_ARCH.to_string()
}

fn default_solver_command() -> String {
    "repofetch-solve".to_string()
}

/// Where an ecosystem's repository list came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    Config,
    DataDir(PathBuf),
    Builtin,
}

/// Repository list chosen for one ecosystem
#[derive(Debug, Clone)]
pub struct RepositorySelection {
    pub urls: Vec<String>,
    pub source: RepositorySource,
    /// An override file that existed but could not be used
    pub ignored: Option<ConfigError>,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: &Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // REPOFETCH_OUTPUT_DIR
        if let Ok(dir) = std::env::var("REPOFETCH_OUTPUT_DIR") {
            if dir.trim().is_empty() {
                return Err(invalid_env("REPOFETCH_OUTPUT_DIR", dir));
            }
            self.general.output_dir = PathBuf::from(dir);
        }

        // REPOFETCH_ARCH
        if let Ok(arch) = std::env::var("REPOFETCH_ARCH") {
            if arch.trim().is_empty() {
                return Err(invalid_env("REPOFETCH_ARCH", arch));
            }
            self.rpm.arch = arch.trim().to_string();
        }

        // REPOFETCH_PARALLEL_DOWNLOADS
        if let Ok(downloads) = std::env::var("REPOFETCH_PARALLEL_DOWNLOADS") {
            match downloads.parse::<usize>() {
                Ok(n) if n > 0 => self.general.parallel_downloads = n,
                _ => return Err(invalid_env("REPOFETCH_PARALLEL_DOWNLOADS", downloads)),
            }
        }

        // REPOFETCH_RETRIES
        if let Ok(retries) = std::env::var("REPOFETCH_RETRIES") {
            self.network.retries = retries
                .parse()
                .map_err(|_| invalid_env("REPOFETCH_RETRIES", retries))?;
        }

        // REPOFETCH_TIMEOUT
        if let Ok(timeout) = std::env::var("REPOFETCH_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(n) if n > 0 => self.network.timeout = n,
                _ => return Err(invalid_env("REPOFETCH_TIMEOUT", timeout)),
            }
        }

        // REPOFETCH_SOLVER
        if let Ok(solver) = std::env::var("REPOFETCH_SOLVER") {
            self.rpm.solver = solver
                .parse()
                .map_err(|_| invalid_env("REPOFETCH_SOLVER", solver))?;
        }

        // REPOFETCH_DATA_DIR
        if let Ok(dir) = std::env::var("REPOFETCH_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.paths.data_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(())
    }

    /// Reject values that would make a run meaningless
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, value: String| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        };

        if self.general.parallel_downloads == 0 {
            return Err(invalid("general.parallel_downloads", "0".to_string()));
        }
        if self.delivery.chunk_size == 0 {
            return Err(invalid("delivery.chunk_size", "0".to_string()));
        }
        if self.delivery.max_attempts == 0 {
            return Err(invalid("delivery.max_attempts", "0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.network.jitter_factor) {
            return Err(invalid(
                "network.jitter_factor",
                self.network.jitter_factor.to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory holding helper tools, repository overrides and logs
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(constants::APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(".").join(constants::APP_DIR_NAME))
        })
    }

    #[must_use]
    pub fn tools_dir(&self) -> PathBuf {
        self.data_dir().join(constants::TOOLS_DIR)
    }

    /// Fallback location for solver helper binaries
    #[must_use]
    pub fn tools_bin_dir(&self) -> PathBuf {
        self.tools_dir().join(constants::TOOLS_BIN_DIR)
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join(constants::LOGS_DIR)
    }

    /// Choose the repository list for an ecosystem
    ///
    /// Configured URLs win, then the data-dir JSON override, then the
    /// built-in mirrors. An unusable override file is reported in
    /// `ignored` and skipped.
    pub async fn repositories_for(&self, ecosystem: Ecosystem) -> RepositorySelection {
        let (configured, file, builtin) = match ecosystem {
            Ecosystem::Rpm => (
                &self.repositories.rpm,
                constants::DEFAULT_RPM_REPOS_FILE,
                BUILTIN_RPM_REPOS,
            ),
            Ecosystem::Deb => (
                &self.repositories.deb,
                constants::DEFAULT_DEB_REPOS_FILE,
                BUILTIN_DEB_REPOS,
            ),
        };

        if !configured.is_empty() {
            return RepositorySelection {
                urls: configured.clone(),
                source: RepositorySource::Config,
                ignored: None,
            };
        }

        let override_path = self.tools_dir().join(file);
        let ignored = match load_repository_list(&override_path).await {
            Ok(Some(urls)) => {
                return RepositorySelection {
                    urls,
                    source: RepositorySource::DataDir(override_path),
                    ignored: None,
                }
            }
            Ok(None) => None,
            Err(e) => Some(e),
        };

        RepositorySelection {
            urls: repository::builtin(builtin),
            source: RepositorySource::Builtin,
            ignored,
        }
    }
}

fn invalid_env(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}
