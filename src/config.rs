//! Configuration loading for tagshelf
//!
//! Settings come from a TOML file plus environment variables. Precedence,
//! highest first:
//! 1. Explicit (non-default) value in the config file
//! 2. Environment variable (`TAGSHELF_HUB_URL`, `TAGSHELF_DATA_PATH`)
//! 3. Compiled default
//!
//! The config file path itself comes from `TAGSHELF_CONFIG`, defaulting to
//! `/config/tagshelf.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default hub base URL (docker-compose service name)
pub const DEFAULT_HUB_URL: &str = "http://hub";
/// Default data volume mount point
pub const DEFAULT_DATA_PATH: &str = "/data";
/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/config/tagshelf.toml";

/// Hub connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub url: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HUB_URL.to_string(),
            api_base: "/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Data volume layout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    pub data_path: PathBuf,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl VolumesConfig {
    /// Hub config directory (catalog file, box registration file)
    pub fn config_path(&self) -> PathBuf {
        self.data_path.join("config")
    }

    /// Content library directory (audio files)
    pub fn library_path(&self) -> PathBuf {
        self.data_path.join("library")
    }

    /// Per-box content root (box directories with tag state files)
    pub fn content_path(&self) -> PathBuf {
        self.data_path.join("content")
    }
}

/// Application behavior settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub auto_reload_config: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            auto_reload_config: true,
        }
    }
}

/// Cache lifetimes per namespace
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Content listing TTL (expensive scan, stable data)
    pub content_ttl_secs: u64,
    /// Catalog TTL (changes more frequently)
    pub catalog_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            content_ttl_secs: 300,
            catalog_ttl_secs: 60,
        }
    }
}

/// Application settings merged from config file and environment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hub: HubConfig,
    pub volumes: VolumesConfig,
    pub app: AppConfig,
    pub cache: CacheConfig,
}

/// Resolve the config file path from the environment
pub fn config_file_path() -> PathBuf {
    std::env::var("TAGSHELF_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing or unparseable file is not fatal: the service starts with
/// defaults so a fresh container comes up without manual setup.
pub fn load(path: &Path) -> Config {
    let config = match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<Config>(&text) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {} (using defaults)", path.display(), e);
                Config::default()
            }
        },
        Err(_) => {
            warn!("Config file not found at {} (using defaults)", path.display());
            Config::default()
        }
    };

    let config = apply_env_overrides(
        config,
        std::env::var("TAGSHELF_HUB_URL").ok(),
        std::env::var("TAGSHELF_DATA_PATH").ok(),
    );

    info!("Hub URL: {}", config.hub.url);
    info!("Data path: {}", config.volumes.data_path.display());
    config
}

/// Apply environment overrides to values the config file left at default.
///
/// An explicit file value always wins over the environment; the environment
/// wins over compiled defaults.
fn apply_env_overrides(
    mut config: Config,
    hub_url: Option<String>,
    data_path: Option<String>,
) -> Config {
    if config.hub.url == DEFAULT_HUB_URL {
        if let Some(url) = hub_url.filter(|u| !u.is_empty()) {
            info!("Using hub.url from environment: {}", url);
            config.hub.url = url;
        }
    }
    if config.volumes.data_path == Path::new(DEFAULT_DATA_PATH) {
        if let Some(path) = data_path.filter(|p| !p.is_empty()) {
            info!("Using volumes.data_path from environment: {}", path);
            config.volumes.data_path = PathBuf::from(path);
        }
    }
    config
}
