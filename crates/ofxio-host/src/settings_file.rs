//! Instance settings saved as versioned JSON.
//!
//! Hosts persist parameter values themselves; these files are for presets
//! and for the command line tool.

use std::path::Path;

use ofxio_core::{OfxIoError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned wrapper around a settings struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile<T> {
    /// Schema version for migration.
    pub version: u32,
    pub settings: T,
    /// Version of the plugin that wrote the file.
    pub plugin_version: String,
}

impl<T> SettingsFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(settings: T) -> Self {
        Self {
            version: CURRENT_VERSION,
            settings,
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| OfxIoError::Serialization(format!("Failed to serialize settings: {}", e)))
    }

    /// Deserialize, migrating older files.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| OfxIoError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(OfxIoError::Serialization(format!(
                "Settings file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;
        serde_json::from_value(migrated)
            .map_err(|e| OfxIoError::Serialization(format!("Failed to parse settings: {}", e)))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;
    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files are the bare settings object
                if data.get("settings").is_none() {
                    data = serde_json::json!({
                        "version": 1,
                        "settings": data,
                        "plugin_version": "0.1.0",
                    });
                }
                version = 1;
            }
            _ => {
                return Err(OfxIoError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }
    Ok(data)
}
