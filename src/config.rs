//! Runtime configuration.
//!
//! Loaded from `{data_path}/mnemos.toml`; missing keys take their defaults.
//! `MNEMOS_MODEL_*` environment variables override the per-role model ids.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::{CoordinatorConfig, SelectionOptions};
use crate::MnemosError;

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "mnemos.toml";

/// Model used by the roles that decide (dialogue, reflection, inference).
pub const DEFAULT_DECISION_MODEL: &str = "anthropic/claude-opus-4.5";
/// Model used for fact extraction.
pub const DEFAULT_EXTRACTION_MODEL: &str = "openai/gpt-4o";

/// Model id per worker role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dialogue: String,
    pub reflection: String,
    pub inference: String,
    pub extraction: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dialogue: DEFAULT_DECISION_MODEL.to_string(),
            reflection: DEFAULT_DECISION_MODEL.to_string(),
            inference: DEFAULT_DECISION_MODEL.to_string(),
            extraction: DEFAULT_EXTRACTION_MODEL.to_string(),
        }
    }
}

impl ModelConfig {
    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots = [
            ("MNEMOS_MODEL_DIALOGUE", &mut self.dialogue),
            ("MNEMOS_MODEL_REFLECTION", &mut self.reflection),
            ("MNEMOS_MODEL_INFERENCE", &mut self.inference),
            ("MNEMOS_MODEL_EXTRACTION", &mut self.extraction),
        ];
        for (key, slot) in slots {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MnemosConfig {
    pub coordinator: CoordinatorConfig,
    pub selection: SelectionOptions,
    pub models: ModelConfig,
}

impl MnemosConfig {
    pub fn from_toml(contents: &str) -> Result<Self, MnemosError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String, MnemosError> {
        toml::to_string_pretty(self).map_err(|e| MnemosError::Config(e.to_string()))
    }
}

/// Load config with priority:
/// 1. `{data_path}/mnemos.toml`
/// 2. Defaults
///
/// Environment overrides are applied last. Unreadable or unparseable files
/// log a warning and fall back to defaults.
pub fn load_config(data_path: &Path) -> MnemosConfig {
    let mut config = read_config_file(data_path).unwrap_or_default();
    config
        .models
        .apply_overrides(|key| std::env::var(key).ok());
    config
}

fn read_config_file(data_path: &Path) -> Option<MnemosConfig> {
    let config_path = data_path.join(CONFIG_FILE);
    if !config_path.exists() {
        return None;
    }
    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match MnemosConfig::from_toml(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", config_path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}. Using default.",
                    config_path.display(),
                    e
                );
                None
            }
        },
        Err(e) => {
            tracing::warn!(
                "Failed to read {}: {}. Using default.",
                config_path.display(),
                e
            );
            None
        }
    }
}
