use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::crypto::KdfParams;
use crate::projection::DEFAULT_PROJECTION_CYCLES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("data directory not found")]
    NoDataDir,
}

/// Top-level settings, read from `cykel.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub calendar: CalendarSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarSettings {
    /// Cycles projected onto the month view.
    #[serde(default = "default_projection_cycles")]
    pub projection_cycles: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            projection_cycles: default_projection_cycles(),
        }
    }
}

fn default_projection_cycles() -> u32 {
    DEFAULT_PROJECTION_CYCLES
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// Sealed profile location. Defaults to the platform data directory.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub kdf: KdfParams,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `path`. A missing file is only an error when `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded config");
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.calendar.projection_cycles == 0 {
            return Err(ConfigError::Invalid(
                "calendar.projection_cycles must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolved path of the sealed profile file.
    pub fn data_file(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.data_file {
            return Ok(path.clone());
        }
        let dir = dirs::data_local_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(dir.join("cykel").join("profile.cykel"))
    }
}
