use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::pdf::CacheLimit;

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfraster";

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV_VAR: &str = "PDFRASTER_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    #[serde(default = "default_max_hits")]
    pub max_hits: usize,

    /// Engine cache limit in bytes, 0 for unbounded
    #[serde(default)]
    pub cache_limit: usize,

    /// RGBA colour painted over search hits
    #[serde(default = "default_highlight")]
    pub highlight: [u8; 4],

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_dpi() -> f32 {
    100.0
}

fn default_max_hits() -> usize {
    20
}

fn default_highlight() -> [u8; 4] {
    [255, 255, 0, 96]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            max_hits: default_max_hits(),
            cache_limit: 0,
            highlight: default_highlight(),
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load settings from `path`. Fields missing from the file keep their
    /// defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded settings from {path:?}");
        Ok(settings)
    }

    /// Locate and load the settings file: `$PDFRASTER_CONFIG` first, then the
    /// per-user config directory. No file at all means defaults.
    pub fn discover() -> Result<Self, SettingsError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load_from_path(Path::new(&path));
        }
        match preferred_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => {
                info!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, SettingsError> {
        serde_yaml::to_string(self).map_err(SettingsError::Serialize)
    }

    pub fn cache_limit(&self) -> CacheLimit {
        CacheLimit::from_bytes(self.cache_limit)
    }

    /// Configured log level; unknown names fall back to `Info`
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}
