// Engine Configuration
// JSON settings for draw priorities and raster decoding

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raster::Predictor;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Draw priority override for one object class (or one class subtype)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityOverride {
    pub class: u16,
    #[serde(default)]
    pub subtype: Option<u16>,
    pub priority: u32,
}

/// Engine settings, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub priorities: Vec<PriorityOverride>,
    /// Predictor for tiles that don't name one
    #[serde(default)]
    pub default_predictor: Predictor,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::info!(
            "[Config] Loaded {} with {} priority overrides",
            path.as_ref().display(),
            config.priorities.len()
        );
        Ok(config)
    }
}
