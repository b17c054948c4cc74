//! Configuration resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line flag (where one exists)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! The access token and campaign id have no default; a run without them
//! fails before any request is made.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bearer token for the membership API
pub const ENV_ACCESS_TOKEN: &str = "PATREON_ACCESS_TOKEN";
/// Campaign whose members are synced
pub const ENV_CAMPAIGN_ID: &str = "PATREON_CAMPAIGN_ID";
/// Output directory override
pub const ENV_DATA_DIR: &str = "PATRON_SYNC_DATA_DIR";
/// API base URL override
pub const ENV_API_BASE_URL: &str = "PATREON_API_BASE_URL";
/// Explicit TOML config path
pub const ENV_CONFIG_PATH: &str = "PATRON_SYNC_CONFIG";

pub const DEFAULT_API_BASE_URL: &str = "https://www.patreon.com/api/oauth2/v2";
pub const DEFAULT_DATA_DIR: &str = "_data";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Config file looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "patron-sync.toml";

/// Optional TOML configuration file
///
/// Every field is optional; missing fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub campaign_id: Option<String>,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Members requested per page
    #[serde(default)]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved configuration for one sync run
#[derive(Clone)]
pub struct SyncConfig {
    pub access_token: String,
    pub campaign_id: String,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub page_size: u32,
    pub log_level: String,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("access_token", &"<redacted>")
            .field("campaign_id", &self.campaign_id)
            .field("api_base_url", &self.api_base_url)
            .field("data_dir", &self.data_dir)
            .field("page_size", &self.page_size)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl SyncConfig {
    /// Resolve configuration from flags, process environment and TOML file
    pub fn resolve(overrides: &ConfigOverrides, config_file: ConfigFile) -> Result<Self> {
        let toml_config = config_file.into_toml();
        Self::from_sources(overrides, &toml_config, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from explicit sources
    ///
    /// `env` looks up an environment variable by name.
    pub fn from_sources<F>(
        overrides: &ConfigOverrides,
        toml_config: &TomlConfig,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| is_valid_value(value));

        let access_token = lookup(ENV_ACCESS_TOKEN)
            .or_else(|| toml_config.access_token.clone().filter(|v| is_valid_value(v)));
        let campaign_id = lookup(ENV_CAMPAIGN_ID)
            .or_else(|| toml_config.campaign_id.clone().filter(|v| is_valid_value(v)));

        let mut missing = Vec::new();
        if access_token.is_none() {
            missing.push(ENV_ACCESS_TOKEN);
        }
        if campaign_id.is_none() {
            missing.push(ENV_CAMPAIGN_ID);
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "{} not set. Configure using one of:\n\
                 1. Environment: {}=... {}=...\n\
                 2. TOML config: ./{} (access_token = \"...\", campaign_id = \"...\")",
                missing.join(" and "),
                ENV_ACCESS_TOKEN,
                ENV_CAMPAIGN_ID,
                LOCAL_CONFIG_FILE,
            )));
        }

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| lookup(ENV_DATA_DIR).map(PathBuf::from))
            .or_else(|| toml_config.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let api_base_url = lookup(ENV_API_BASE_URL)
            .or_else(|| toml_config.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let page_size = match toml_config.page_size {
            Some(0) => {
                return Err(Error::Config("page_size must be greater than zero".to_string()))
            }
            Some(size) => size,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            // Both checked above
            access_token: access_token.unwrap_or_default().trim().to_string(),
            campaign_id: campaign_id.unwrap_or_default().trim().to_string(),
            api_base_url,
            data_dir,
            page_size,
            log_level: toml_config.logging.level.clone(),
        })
    }
}

/// Value is non-empty and not just whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Locate the TOML config file
///
/// Order: explicit path, `PATRON_SYNC_CONFIG`, `./patron-sync.toml`,
/// `<config dir>/patron-sync/config.toml`.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if is_valid_value(&path) {
            return Some(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("patron-sync").join("config.toml"))
        .filter(|path| path.exists())
}

/// TOML config file as found on disk
///
/// Loading never fails: a missing or malformed file falls back to defaults
/// when converted with [`ConfigFile::into_toml`], since environment variables
/// may still provide everything needed. The parse outcome is kept until then
/// so the log level can be read before logging is set up.
#[derive(Debug)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    parsed: Option<Result<TomlConfig>>,
}

impl ConfigFile {
    /// Locate and parse the config file (see [`locate_config_file`])
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = locate_config_file(explicit);
        let parsed = path.as_deref().map(read_toml_config);
        Self { path, parsed }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Log level from the file, if it parsed
    pub fn log_level(&self) -> Option<&str> {
        match &self.parsed {
            Some(Ok(config)) => Some(config.logging.level.as_str()),
            _ => None,
        }
    }

    /// Parsed settings, or defaults when the file is missing or unusable
    pub fn into_toml(self) -> TomlConfig {
        match (self.path, self.parsed) {
            (Some(path), Some(Ok(config))) => {
                info!(path = %path.display(), "Loaded TOML config");
                config
            }
            (Some(path), Some(Err(e))) => {
                warn!(path = %path.display(), error = %e, "Ignoring unusable TOML config");
                TomlConfig::default()
            }
            _ => {
                debug!("No TOML config file found, using environment and defaults");
                TomlConfig::default()
            }
        }
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed for {}: {}", path.display(), e)))
}
