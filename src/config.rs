use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Kernel directory holding raw input device nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Runtime settings for the gamepad subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned and watched for `event*` device nodes. Overridable
    /// for containers and tests.
    pub device_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
        }
    }
}

impl Config {
    /// Loads settings from a JSON file, falling back to `None` when the file
    /// is missing or unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::error!("Failed to parse config: {}", e);
                    None
                }
            },
            Err(e) => {
                log::error!("Failed to read config file: {}", e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| Error::ConfigFormat {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, contents).map_err(|e| Error::ConfigIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!("Saved config to {:?}", path);
        Ok(())
    }
}
