//! Configuration loading for the Vigil stack.
//!
//! This module provides typed, validated loading of configuration files for
//! Vigil components. Formats are auto-detected from the file extension.

use crate::{Validatable, VigilError, VigilResult};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

/// File-based configuration source
pub struct FileConfigSource {
    path: PathBuf,
    format: ConfigFormat,
}

impl FileConfigSource {
    /// Create a new file config source
    pub fn new<P: AsRef<Path>>(path: P, format: ConfigFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    /// Auto-detect format from file extension
    pub fn auto_detect<P: AsRef<Path>>(path: P) -> VigilResult<Self> {
        let path = path.as_ref();
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("json") => ConfigFormat::Json,
            _ => {
                return Err(VigilError::config(
                    "Cannot detect config format from file extension",
                ))
            }
        };

        Ok(Self::new(path, format))
    }

    /// Get the source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate a typed configuration from this source
    pub fn load<T>(&self) -> VigilResult<T>
    where
        T: DeserializeOwned + Validatable,
    {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| VigilError::config(format!("Failed to read config file: {e}")))?;

        let config: T = match self.format {
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| VigilError::config(format!("Failed to parse TOML: {e}")))?,
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| VigilError::config(format!("Failed to parse JSON: {e}")))?,
        };

        config.validate()?;
        Ok(config)
    }
}
