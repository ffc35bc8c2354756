//! # syndicate-config
//!
//! Configuration management for the Syndicate UG bindings.
//!
//! Loads configuration from:
//! 1. `~/.syndicate/config.toml` (global)
//! 2. `.syndicate/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use syndicate_sys::LibraryPaths;
use tracing::debug;

/// Default chunk size for streaming reads (64 KiB)
pub const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> std::sync::RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap_or_else(PoisonError::into_inner)
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub gateway: GatewayConfig,
    pub io: IoConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let mut config = Self::load_from(global.as_deref(), Some(Path::new(".syndicate/config.toml")))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from explicit global/project files. Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        if let Some(project_path) = project {
            if project_path.exists() {
                debug!("Loading project config from {:?}", project_path);
                let contents = std::fs::read_to_string(project_path)?;
                let project_config: Config = toml::from_str(&contents)?;
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// Global config path: ~/.syndicate/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".syndicate/config.toml"))
    }

    /// Merge another config (project overrides). Fields left at their
    /// default in `other` keep the current value.
    fn merge(&mut self, other: Config) {
        let lib_default = LibraryConfig::default();
        if other.library.fskit != lib_default.fskit {
            self.library.fskit = other.library.fskit;
        }
        if other.library.syndicate != lib_default.syndicate {
            self.library.syndicate = other.library.syndicate;
        }
        if other.library.ug != lib_default.ug {
            self.library.ug = other.library.ug;
        }

        if !other.gateway.user.is_empty() {
            self.gateway.user = other.gateway.user;
        }
        if !other.gateway.volume.is_empty() {
            self.gateway.volume = other.gateway.volume;
        }
        if !other.gateway.gateway.is_empty() {
            self.gateway.gateway = other.gateway.gateway;
        }
        if other.gateway.anonymous {
            self.gateway.anonymous = true;
        }
        if other.gateway.debug_level.is_some() {
            self.gateway.debug_level = other.gateway.debug_level;
        }

        let io_default = IoConfig::default();
        if other.io.read_chunk_size != io_default.read_chunk_size {
            self.io.read_chunk_size = other.io.read_chunk_size;
        }
        if other.io.readdir_batch != io_default.readdir_batch {
            self.io.readdir_batch = other.io.readdir_batch;
        }
    }

    /// Apply environment variable overrides, reading through `var`.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("SYNDICATE_LIB_DIR") {
            let paths = LibraryPaths::in_dir(dir);
            self.library.fskit = paths.fskit;
            self.library.syndicate = paths.syndicate;
            self.library.ug = paths.ug;
        }
        if let Some(user) = var("SYNDICATE_USER") {
            self.gateway.user = user;
        }
        if let Some(volume) = var("SYNDICATE_VOLUME") {
            self.gateway.volume = volume;
        }
        if let Some(gateway) = var("SYNDICATE_GATEWAY") {
            self.gateway.gateway = gateway;
        }
        if let Some(anon) = var("SYNDICATE_ANONYMOUS") {
            self.gateway.anonymous = matches!(anon.as_str(), "1" | "true" | "yes");
        }
        if let Some(level) = var("SYNDICATE_DEBUG") {
            if let Ok(n) = level.parse() {
                self.gateway.debug_level = Some(n);
            }
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// Native library locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// libfskit (loaded for its global symbols)
    pub fskit: PathBuf,
    /// libsyndicate
    pub syndicate: PathBuf,
    /// libsyndicate-ug
    pub ug: PathBuf,
}

impl LibraryConfig {
    pub fn paths(&self) -> LibraryPaths {
        LibraryPaths {
            fskit: self.fskit.clone(),
            syndicate: self.syndicate.clone(),
            ug: self.ug.clone(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let paths = LibraryPaths::default();
        Self {
            fskit: paths.fskit,
            syndicate: paths.syndicate,
            ug: paths.ug,
        }
    }
}

/// Default gateway identity passed to `UG_init`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub user: String,
    pub volume: String,
    pub gateway: String,
    pub anonymous: bool,
    pub debug_level: Option<u8>,
}

/// Buffer sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Bytes requested per read when streaming a file
    pub read_chunk_size: usize,
    /// Entries requested per `UG_readdir` call
    pub readdir_batch: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK,
            readdir_batch: 1,
        }
    }
}
