//! Configuration loading and root folder resolution
//!
//! Settings come from a TOML file (`~/.config/rollcall/rollcall.toml` by
//! default). Command-line arguments and `ROLLCALL_*` environment variables
//! override the file; compiled defaults fill whatever is left.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dates::{AttendanceDate, DatePolicy};
use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "ROLLCALL_ROOT_FOLDER";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "ROLLCALL_CONFIG";

/// Contents of rollcall.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub delegate: DelegateConfig,
    pub attendance: AttendanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name, relative to the root folder
    pub database_file: String,
    /// How long a write may keep retrying while SQLite reports lock contention
    pub max_lock_wait_ms: u64,
    /// SSE / subscription event buffer per subscriber
    pub event_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "rollcall.db".to_string(),
            max_lock_wait_ms: 5000,
            event_capacity: 256,
        }
    }
}

/// Generative-AI service settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegateConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound on one recognition or summary round-trip
    pub timeout_secs: u64,
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl std::fmt::Debug for DelegateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Earliest markable date (`YYYY-MM-DD`)
    pub min_date: String,
    pub allow_future_dates: bool,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            min_date: "2000-01-01".to_string(),
            allow_future_dates: false,
        }
    }
}

impl AttendanceConfig {
    pub fn date_policy(&self) -> Result<DatePolicy> {
        let min_date: AttendanceDate = self
            .min_date
            .parse()
            .map_err(|e| Error::Config(format!("attendance.min_date: {}", e)))?;
        Ok(DatePolicy::new(min_date, self.allow_future_dates))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Platform location of rollcall.toml, honouring `ROLLCALL_CONFIG`
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("rollcall").join("rollcall.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load the config file if present, otherwise defaults
///
/// A file that exists but does not parse is an error; a missing file is not.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(p) if p.exists() => {
            tracing::info!("Loading config from {}", p.display());
            load_toml_config(p)
        }
        Some(p) => {
            tracing::debug!("No config file at {}, using defaults", p.display());
            Ok(TomlConfig::default())
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `ROLLCALL_ROOT_FOLDER`
/// 3. `root_folder` in the TOML config
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rollcall"))
        .unwrap_or_else(|| PathBuf::from("./rollcall_data"))
}
