//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STORYSHELL_*)
//! 2. TOML config file (if STORYSHELL_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::PartitionNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STORYSHELL_*)
/// 2. TOML config file (if STORYSHELL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache partitions and favorites.
    ///
    /// Set via STORYSHELL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the remote story API. Requests to it are served network-first.
    ///
    /// Set via STORYSHELL_API_ORIGIN environment variable.
    #[serde(default = "default_api_origin")]
    pub api_origin: String,

    /// Origin the application shell is served from. Root-relative paths
    /// (manifest entries, offline fallbacks) resolve against it.
    ///
    /// Set via STORYSHELL_SHELL_ORIGIN environment variable.
    #[serde(default = "default_shell_origin")]
    pub shell_origin: String,

    /// Prefix shared by all partition names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version suffix of all partition names. Bumping it makes activation
    /// drop every partition of the previous version.
    ///
    /// Set via STORYSHELL_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Root-relative paths cached as a unit at install time.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Message placed in the synthetic offline API response.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via STORYSHELL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body written to a cache partition. Larger
    /// responses are still served, just never cached.
    ///
    /// Set via STORYSHELL_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional HTTP request timeout in milliseconds. Unset means a hung
    /// request hangs only its own task.
    ///
    /// Set via STORYSHELL_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./storyshell.sqlite")
}

fn default_api_origin() -> String {
    "https://story-api.dicoding.dev".into()
}

fn default_shell_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "dstory".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_shell_manifest() -> Vec<String> {
    let mut manifest: Vec<String> = ["/", "/index.html", "/manifest.json", "/styles.css", "/bundle.js"]
        .into_iter()
        .map(String::from)
        .collect();
    manifest.extend(
        [72, 96, 128, 144, 152, 192, 384, 512]
            .into_iter()
            .map(|size| format!("/images/icons/icon-{size}x{size}.png")),
    );
    manifest.push("/offline.html".into());
    manifest
}

fn default_offline_message() -> String {
    "Offline - Data tidak tersedia".into()
}

fn default_user_agent() -> String {
    "storyshell/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_origin: default_api_origin(),
            shell_origin: default_shell_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            shell_manifest: default_shell_manifest(),
            offline_message: default_offline_message(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The versioned partition names for this configuration.
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::versioned(&self.cache_prefix, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STORYSHELL_`
    /// 2. TOML file from `STORYSHELL_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STORYSHELL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STORYSHELL_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
