//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::infrastructure::image::{CoverArtLoaderConfig, DEFAULT_IMAGE_SIZE, DiskStore};

pub(super) const APP_NAME: &str = "coverart";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "coverart";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverArtConfig {
    /// Root of the on-disk cover cache.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Side of the square covers in pixels.
    #[serde(default = "default_image_size")]
    pub image_size: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum background loads running at once.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

fn default_image_size() -> u32 {
    DEFAULT_IMAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    CoverArtLoaderConfig::default().timeout_secs
}

fn default_max_concurrent_downloads() -> usize {
    CoverArtLoaderConfig::default().max_concurrent_downloads
}

impl CoverArtConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(cache_dir) = &args.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(size) = args.size {
            self.image_size = size;
        }
        if let Some(timeout) = args.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
    }

    /// Returns the disk store for the configured cache directory.
    #[must_use]
    pub fn disk_store(&self) -> DiskStore {
        self.cache_dir
            .as_ref()
            .map_or_else(DiskStore::default_location, |dir| DiskStore::new(dir))
    }

    /// Returns the loader settings.
    #[must_use]
    pub fn loader_config(&self) -> CoverArtLoaderConfig {
        CoverArtLoaderConfig {
            image_size: self.image_size,
            max_concurrent_downloads: self.max_concurrent_downloads,
            timeout_secs: self.timeout_secs,
        }
    }
}

impl Default for CoverArtConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            image_size: default_image_size(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            log_level: LogLevel::Info,
            log_path: None,
        }
    }
}
