//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SEVACACHE_*)
//! 2. TOML config file (if SEVACACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SEVACACHE_*)
/// 2. TOML config file (if SEVACACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite store database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version label for this deployment's set of stores.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Base origin the application is served from. Critical and optional
    /// asset paths resolve against this.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the application shell document, served to navigation
    /// requests that cannot reach the network and have no exact match.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Assets that must be cached before a generation can install.
    /// Any failure here aborts installation.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Assets cached best-effort during installation. Individual failures
    /// are logged and do not abort.
    #[serde(default)]
    pub optional_assets: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds. The engine adds no timeout of
    /// its own beyond the transport's.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to accept per response body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Always-fresh API hosts that bypass the cache engine entirely.
    #[serde(default)]
    pub bypass_hosts: Vec<String>,

    /// Map-tile provider hosts, served cache-first from the tiles store.
    #[serde(default = "default_tile_hosts")]
    pub tile_hosts: Vec<String>,

    /// Script-CDN hosts, served cache-first from the vendor store.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    /// Host matching granularity for the rules above: "exact" or "prefix".
    #[serde(default = "default_host_match")]
    pub host_match: String,

    /// File extensions served cache-first from the runtime store.
    #[serde(default = "default_cache_first_exts")]
    pub cache_first_exts: Vec<String>,

    /// File extensions served network-first from the runtime store.
    #[serde(default = "default_network_first_exts")]
    pub network_first_exts: Vec<String>,

    /// File extensions that bypass the cache entirely (network-only).
    #[serde(default = "default_bypass_exts")]
    pub bypass_exts: Vec<String>,

    /// Per-store record cap applied when trimming image-class stores.
    #[serde(default = "default_store_cap")]
    pub store_cap: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sevacache.sqlite")
}

fn default_generation() -> String {
    "dev".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_shell_path() -> String {
    "/index.html".into()
}

fn default_critical_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_user_agent() -> String {
    "sevacache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_body_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_tile_hosts() -> Vec<String> {
    vec![
        "tile.openstreetmap.org".into(),
        "a.tile.openstreetmap.org".into(),
        "b.tile.openstreetmap.org".into(),
        "c.tile.openstreetmap.org".into(),
    ]
}

fn default_cdn_hosts() -> Vec<String> {
    vec!["cdn.jsdelivr.net".into(), "unpkg.com".into()]
}

fn default_host_match() -> String {
    "exact".into()
}

fn default_cache_first_exts() -> Vec<String> {
    ["css", "js", "woff", "woff2", "ttf", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_network_first_exts() -> Vec<String> {
    vec!["html".into(), "json".into()]
}

fn default_bypass_exts() -> Vec<String> {
    Vec::new()
}

fn default_store_cap() -> usize {
    150
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            generation: default_generation(),
            origin: default_origin(),
            shell_path: default_shell_path(),
            critical_assets: default_critical_assets(),
            optional_assets: Vec::new(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            max_redirects: default_max_redirects(),
            bypass_hosts: Vec::new(),
            tile_hosts: default_tile_hosts(),
            cdn_hosts: default_cdn_hosts(),
            host_match: default_host_match(),
            cache_first_exts: default_cache_first_exts(),
            network_first_exts: default_network_first_exts(),
            bypass_exts: default_bypass_exts(),
            store_cap: default_store_cap(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SEVACACHE_`
    /// 2. TOML file from `SEVACACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SEVACACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SEVACACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./sevacache.sqlite"));
        assert_eq!(config.generation, "dev");
        assert_eq!(config.shell_path, "/index.html");
        assert_eq!(config.critical_assets, vec!["/".to_string(), "/index.html".to_string()]);
        assert_eq!(config.host_match, "exact");
        assert_eq!(config.max_body_bytes, 5_242_880);
        assert!(config.cache_first_exts.contains(&"css".to_string()));
        assert!(config.network_first_exts.contains(&"json".to_string()));
        assert!(config.bypass_hosts.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
