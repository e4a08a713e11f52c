//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/adapt/config.toml`.

use crate::buffer::{DEFAULT_CAPACITY, MIN_SAMPLES};
use crate::coaching::DEFAULT_FEED_CAPACITY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub equipment: EquipmentConfig,

    #[serde(default)]
    pub user: UserConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Decision engine tuning
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Snapshots kept per exercise
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Snapshots required before decisions carry any confidence
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// How far back the performance repository is queried
    #[serde(default = "default_history_window_days")]
    pub history_window_days: i64,

    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            min_samples: default_min_samples(),
            history_window_days: default_history_window_days(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_samples < MIN_SAMPLES {
            return Err(Error::Config(format!(
                "engine.min_samples ({}) must be at least {}",
                self.min_samples, MIN_SAMPLES
            )));
        }
        if self.buffer_capacity > DEFAULT_CAPACITY {
            return Err(Error::Config(format!(
                "engine.buffer_capacity ({}) must be at most {}",
                self.buffer_capacity, DEFAULT_CAPACITY
            )));
        }
        if self.buffer_capacity < self.min_samples {
            return Err(Error::Config(format!(
                "engine.buffer_capacity ({}) must be >= engine.min_samples ({})",
                self.buffer_capacity, self.min_samples
            )));
        }
        if self.history_window_days <= 0 {
            return Err(Error::Config("engine.history_window_days must be positive".into()));
        }
        if self.feed_capacity == 0 {
            return Err(Error::Config("engine.feed_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Equipment availability configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EquipmentConfig {
    #[serde(default = "default_equipment")]
    pub available: Vec<String>,
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        Self {
            available: default_equipment(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("adapt")
}

fn default_buffer_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_min_samples() -> usize {
    MIN_SAMPLES
}

fn default_history_window_days() -> i64 {
    30
}

fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

fn default_equipment() -> Vec<String> {
    vec!["dumbbell".into(), "pullup_bar".into(), "bands".into()]
}

fn default_user_id() -> String {
    "default".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.user.user_id.trim().is_empty() {
            return Err(Error::Config("user.user_id must not be empty".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("adapt").join("config.toml")
    }

    /// Journal of completed sets
    pub fn journal_path(&self) -> PathBuf {
        self.data.data_dir.join("performance.jsonl")
    }

    /// Long-term CSV archive of completed sets
    pub fn archive_path(&self) -> PathBuf {
        self.data.data_dir.join("performance.csv")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    ///
    /// Writes to a temp file in the same directory and renames it into
    /// place, so readers never see a partial file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
