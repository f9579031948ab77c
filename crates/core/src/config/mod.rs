//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECACHE_*)
//! 2. TOML config file (if PRECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRECACHE_*)
/// 2. TOML config file (if PRECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the application whose requests are cached.
    ///
    /// Set via PRECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current cache partition.
    ///
    /// Set via PRECACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path of the build manifest listing fingerprinted resources.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Path prefix prepended to every manifest resource key.
    #[serde(default = "default_manifest_resource_prefix")]
    pub manifest_resource_prefix: String,

    /// Path of the version marker.
    #[serde(default = "default_marker_path")]
    pub marker_path: String,

    /// Resources cached verbatim on every install, in order.
    ///
    /// Set via PRECACHE_STATIC_RESOURCES environment variable (comma-separated).
    #[serde(default = "default_static_resources")]
    pub static_resources: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via PRECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Cookie header sent with credentialed requests to the origin.
    ///
    /// Set via PRECACHE_SESSION_COOKIE environment variable.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_manifest_path() -> String {
    "/_framework/blazor.boot.json".into()
}

fn default_manifest_resource_prefix() -> String {
    "/_framework/".into()
}

fn default_marker_path() -> String {
    "/MILESTONE".into()
}

fn default_static_resources() -> Vec<String> {
    [
        "/",
        "/MILESTONE",
        "/_framework/blazor.boot.json",
        "/app.ico",
        "/backdrop.png",
        "/AndyBold.ttf",
        "/assets/index.js",
        "/assets/index.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precache.sqlite")
}

fn default_user_agent() -> String {
    "precache/0.1".into()
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            manifest_path: default_manifest_path(),
            manifest_resource_prefix: default_manifest_resource_prefix(),
            marker_path: default_marker_path(),
            static_resources: default_static_resources(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            session_cookie: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => {
                Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") })
            }
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRECACHE_`
    /// 2. TOML file from `PRECACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PRECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRECACHE_")
                .ignore(&["CONFIG_FILE", "STATIC_RESOURCES"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        if let Ok(list) = std::env::var("PRECACHE_STATIC_RESOURCES") {
            let resources: Vec<String> =
                list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
            figment = figment.merge(Serialized::default("static_resources", resources));
        }

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
