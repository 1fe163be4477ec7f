//! Configuration types for GIFL batch encoding.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings shared by every file in a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Frame rate for every output, replacing the rate derived from the GIF.
    pub fps: Option<f64>,
    /// Directory for all containers. `None` writes each one next to its GIF.
    pub output_dir: Option<PathBuf>,
    /// Encode files concurrently.
    pub parallel: bool,
    /// Read every container back after writing it.
    pub verify: bool,
}

impl EncoderConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(fps) = self.fps {
            if !fps.is_finite() {
                return Err(ConfigError::NonFiniteFps(fps));
            }
        }
        if let Some(dir) = &self.output_dir {
            if !dir.is_dir() {
                return Err(ConfigError::OutputNotDirectory(dir.clone()));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fps override must be a finite number, got {0}")]
    NonFiniteFps(f64),
    #[error("output directory {} does not exist", .0.display())]
    OutputNotDirectory(PathBuf),
}
