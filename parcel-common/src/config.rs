//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file at the default location is not an error: the resolver logs
//! and falls back to compiled defaults. A file that was asked for explicitly (flag or
//! environment) must exist, and a file that exists must parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable overriding the backend base URL
pub const ENV_BACKEND_URL: &str = "PARCEL_SCOUT_BACKEND_URL";

/// Environment variable naming the TOML config file
pub const ENV_CONFIG_PATH: &str = "PARCEL_SCOUT_CONFIG";

/// Compiled defaults
pub struct CompiledDefaults;

impl CompiledDefaults {
    pub const BACKEND_URL: &'static str = "http://localhost:5000";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const LOG_LEVEL: &'static str = "info";
    pub const EXPECTED_TOTAL: usize = 1000;
    pub const PUBLISH_EVERY: usize = 50;
    pub const SETTLE_DELAY_MS: u64 = 500;
    pub const TOP_N: usize = 50;
    pub const EXPORT_FILE_NAME: &'static str = "parcels_filtered.csv";

    /// Default config file location (`<config_dir>/parcel-scout/config.toml`)
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("parcel-scout").join("config.toml"))
    }
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: CompiledDefaults::LOG_LEVEL.to_string(),
        }
    }
}

/// Ingestion section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Estimated record count used for the progress percentage
    pub expected_total: usize,
    /// Publish a snapshot every this many records
    pub publish_every: usize,
    /// Pause between the 100% snapshot and the ready signal
    pub settle_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            expected_total: CompiledDefaults::EXPECTED_TOTAL,
            publish_every: CompiledDefaults::PUBLISH_EVERY,
            settle_delay_ms: CompiledDefaults::SETTLE_DELAY_MS,
        }
    }
}

impl IngestConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Ranking section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Length of the Top-N shortlist
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: CompiledDefaults::TOP_N,
        }
    }
}

/// Export section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: CompiledDefaults::EXPORT_FILE_NAME.to_string(),
        }
    }
}

/// TOML configuration file contents
///
/// Every section is optional in the file; omitted keys take compiled defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Backend base URL (no trailing slash needed)
    pub backend_url: String,
    /// Per-request timeout for the HTTP client
    pub request_timeout_secs: u64,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
    pub ranking: RankingConfig,
    pub export: ExportConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_url: CompiledDefaults::BACKEND_URL.to_string(),
            request_timeout_secs: CompiledDefaults::REQUEST_TIMEOUT_SECS,
            logging: LoggingConfig::default(),
            ingest: IngestConfig::default(),
            ranking: RankingConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            return Err(Error::Config("backend_url must not be empty".to_string()));
        }
        if self.ingest.expected_total == 0 {
            return Err(Error::Config(
                "ingest.expected_total must be greater than 0".to_string(),
            ));
        }
        if self.ingest.publish_every == 0 {
            return Err(Error::Config(
                "ingest.publish_every must be greater than 0".to_string(),
            ));
        }
        if self.ranking.top_n == 0 {
            return Err(Error::Config("ranking.top_n must be greater than 0".to_string()));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(Error::Config("export.file_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Resolves the effective configuration from CLI, environment, file and defaults
#[derive(Debug, Default, Clone)]
pub struct ConfigResolver {
    cli_config_path: Option<PathBuf>,
    cli_backend_url: Option<String>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config file given on the command line
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_config_path = path;
        self
    }

    /// Backend URL given on the command line
    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        self.cli_backend_url = url;
        self
    }

    /// Resolve and validate the configuration
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = self.load_file()?;

        // Backend URL: CLI → ENV → TOML → default
        if let Some(url) = &self.cli_backend_url {
            info!("Backend URL from command line");
            config.backend_url = url.clone();
        } else if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            if !url.trim().is_empty() {
                info!("Backend URL from {}", ENV_BACKEND_URL);
                config.backend_url = url;
            }
        }

        config.backend_url = config.backend_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn load_file(&self) -> Result<TomlConfig> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_config_path {
            info!("Loading config from {}", path.display());
            return TomlConfig::load(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            if !path.trim().is_empty() {
                info!("Loading config from {} ({})", path, ENV_CONFIG_PATH);
                return TomlConfig::load(Path::new(&path));
            }
        }

        // Priority 3: Default location; absence is fine
        match CompiledDefaults::config_file_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                TomlConfig::load(&path)
            }
            Some(path) => {
                debug!("No config file at {}, using compiled defaults", path.display());
                Ok(TomlConfig::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
