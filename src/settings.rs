//! Tunables for capture, persistence and paste, with JSON persistence.

use crate::error::{Result, SchematicError};
use crate::paste::HeightOverflow;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchematicSettings {
    /// Directory documents are saved to and loaded from.
    pub schematics_dir: PathBuf,
    /// Wall-clock budget for one scan slice on the tick loop, in milliseconds.
    pub slice_budget_ms: u64,
    /// Voxel-format generation stamped into `DataVersion`.
    pub data_version: i32,
    /// Gzip level, 0-9.
    pub compression_level: u32,
    /// Highest number of layers a paste may place.
    pub max_paste_height: i32,
    /// What to do with voxels that would land above the world.
    pub height_overflow: HeightOverflow,
    /// Register a progress subscriber on pastes that have an observer.
    pub notify_progress: bool,
    /// File-name template for export-all batches (`%id%`, `%idx%`, `%idy%`, `%world%`).
    pub default_naming_scheme: Option<String>,
}

impl Default for SchematicSettings {
    fn default() -> Self {
        Self {
            schematics_dir: PathBuf::from("schematics"),
            slice_budget_ms: 40,
            data_version: 3465,
            compression_level: 6,
            max_paste_height: 256,
            height_overflow: HeightOverflow::Skip,
            notify_progress: true,
            default_naming_scheme: None,
        }
    }
}

impl SchematicSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: SchematicSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(SchematicError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.max_paste_height <= 0 {
            return Err(SchematicError::Config(format!(
                "max_paste_height must be positive, got {}",
                self.max_paste_height
            )));
        }
        Ok(())
    }

    pub fn slice_budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }

    pub fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level)
    }
}
