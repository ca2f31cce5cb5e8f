//! Configuration file support for the workout engine.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/workout/config.toml`.

use crate::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
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

/// Guided session behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_undo_window_seconds")]
    pub undo_window_seconds: u32,

    /// Equipment that does not need a weight target before a session begins
    #[serde(default = "default_weightless_equipment")]
    pub weightless_equipment: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_window_seconds: default_undo_window_seconds(),
            weightless_equipment: default_weightless_equipment(),
        }
    }
}

/// Runtime parameters handed to the session controller
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub undo_window: Duration,
    pub weightless_equipment: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        SessionConfig::default().engine()
    }
}

impl EngineConfig {
    /// Whether the equipment label is exempt from the weight requirement
    pub fn is_weightless(&self, equipment: Option<&str>) -> bool {
        let Some(equipment) = equipment else {
            return false;
        };
        let wanted = normalize_equipment(equipment);
        self.weightless_equipment
            .iter()
            .any(|e| normalize_equipment(e) == wanted)
    }
}

impl SessionConfig {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            undo_window: Duration::seconds(i64::from(self.undo_window_seconds)),
            weightless_equipment: self.weightless_equipment.clone(),
        }
    }
}

/// Lowercase and drop separators so "Ab-Wheel" matches "ab wheel"
fn normalize_equipment(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/share"),
        Err(_) => PathBuf::from("."),
    });
    base.join("workout")
}

fn default_undo_window_seconds() -> u32 {
    5
}

fn default_weightless_equipment() -> Vec<String> {
    vec!["bodyweight".into(), "band".into(), "ab wheel".into()]
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

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config"),
            Err(_) => PathBuf::from("."),
        });
        base.join("workout").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
