//! Configuration file support for quicklabel.
//!
//! This module provides serialization and deserialization of application settings
//! and dataset type definitions. Every field carries a serde default, so a partial
//! file (or no file at all) yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_SAVE_INTERVAL, DEFAULT_CACHE_CAPACITY, DEFAULT_CLASS_COUNT, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_DIMENSION, DEFAULT_PRELOAD_WINDOW, UNDO_HISTORY_SIZE,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Dataset type definitions
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Global settings section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of images kept warm around the current index
    #[serde(default = "default_preload_window")]
    pub preload_window: usize,

    /// Labeling operations between automatic saves (0 disables auto-save)
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: usize,

    /// Number of recompressed images held in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Longest edge of a served image, in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// JPEG quality of served images (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Number of label classes; labels must be below this value
    #[serde(default = "default_class_count")]
    pub class_count: u32,

    /// Maximum number of transitions kept for undo
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,

    /// Image file extensions picked up by the directory scan (lowercase, no dot)
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,

    /// Directory holding the annotation log and session state
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_preload_window() -> usize {
    DEFAULT_PRELOAD_WINDOW
}

fn default_auto_save_interval() -> usize {
    DEFAULT_AUTO_SAVE_INTERVAL
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_class_count() -> u32 {
    DEFAULT_CLASS_COUNT
}

fn default_undo_limit() -> usize {
    UNDO_HISTORY_SIZE
}

fn default_supported_formats() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tiff"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("quicklabel"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preload_window: default_preload_window(),
            auto_save_interval: default_auto_save_interval(),
            cache_capacity: default_cache_capacity(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            class_count: default_class_count(),
            undo_limit: default_undo_limit(),
            supported_formats: default_supported_formats(),
            data_dir: default_data_dir(),
            log_level: LogLevel::default(),
        }
    }
}

/// One dataset type: a named set of image directories sharing a labeling task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Unique name of the dataset type
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Directories scanned for images
    #[serde(default)]
    pub image_dirs: Vec<PathBuf>,

    /// Scan subdirectories too
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Directory names (or path fragments) skipped during the scan
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Sort key for listing dataset types (lower first)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_recursive() -> bool {
    true
}

fn default_priority() -> i32 {
    1
}

impl DatasetConfig {
    /// Create a dataset type scanning a single directory recursively.
    pub fn new(name: &str, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            image_dirs: vec![image_dir.into()],
            recursive: default_recursive(),
            exclude_dirs: Vec::new(),
            priority: default_priority(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            settings: Settings::default(),
            datasets: Vec::new(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Look up a dataset type by name.
    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Dataset types ordered by priority, then name.
    pub fn datasets_by_priority(&self) -> Vec<&DatasetConfig> {
        let mut datasets: Vec<&DatasetConfig> = self.datasets.iter().collect();
        datasets.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
        datasets
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "quicklabel-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("quicklabel").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("quicklabel")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing file yields the default configuration; a file that exists but
    /// cannot be read or parsed is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::new()),
            },
        };

        if !path.exists() {
            log::debug!("No config file found at {:?}, using defaults", path);
            return Ok(Self::new());
        }

        Self::load(&path)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
