//! Configuration resolution for rollcall-svc
//!
//! Turns the TOML file, environment and command line into one
//! [`ServiceConfig`]. Priority is CLI > environment > TOML > defaults.

use rollcall_common::config::TomlConfig;
use rollcall_common::dates::DatePolicy;
use rollcall_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the generative-AI API key
pub const API_KEY_ENV: &str = "ROLLCALL_GENAI_API_KEY";

/// Values supplied on the command line (or their `env` fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved service settings
#[derive(Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub max_lock_wait_ms: u64,
    pub event_capacity: usize,
    pub delegate_base_url: String,
    pub delegate_model: String,
    pub api_key: Option<String>,
    pub delegate_timeout: Duration,
    pub date_policy: DatePolicy,
    pub log_level: String,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("max_lock_wait_ms", &self.max_lock_wait_ms)
            .field("event_capacity", &self.event_capacity)
            .field("delegate_base_url", &self.delegate_base_url)
            .field("delegate_model", &self.delegate_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("delegate_timeout", &self.delegate_timeout)
            .field("date_policy", &self.date_policy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ServiceConfig {
    /// Resolve settings for a service rooted at `root_folder`
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig, root_folder: &Path) -> Result<Self> {
        if toml_config.delegate.timeout_secs == 0 {
            return Err(Error::Config("delegate.timeout_secs must be at least 1".to_string()));
        }
        if toml_config.storage.event_capacity == 0 {
            return Err(Error::Config("storage.event_capacity must be at least 1".to_string()));
        }

        let database_file = Path::new(&toml_config.storage.database_file);
        let database_path = if database_file.is_absolute() {
            database_file.to_path_buf()
        } else {
            root_folder.join(database_file)
        };

        Ok(Self {
            host: cli
                .host
                .clone()
                .unwrap_or_else(|| toml_config.server.host.clone()),
            port: cli.port.unwrap_or(toml_config.server.port),
            database_path,
            max_lock_wait_ms: toml_config.storage.max_lock_wait_ms,
            event_capacity: toml_config.storage.event_capacity,
            delegate_base_url: toml_config.delegate.base_url.clone(),
            delegate_model: toml_config.delegate.model.clone(),
            api_key: resolve_api_key(toml_config),
            delegate_timeout: Duration::from_secs(toml_config.delegate.timeout_secs),
            date_policy: toml_config.attendance.date_policy()?,
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml_config.logging.level.clone()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the generative-AI API key
///
/// **Priority:** ENV → TOML. A missing key is not fatal: the service starts
/// and delegate-backed endpoints answer 502 until one is configured.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .delegate
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in both environment and TOML config. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Generative-AI API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Generative-AI API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Generative-AI API key not configured. Set {} or [delegate] api_key in the config file; \
         recognition, face counting and summaries are unavailable until then.",
        API_KEY_ENV
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
