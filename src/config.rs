//! Assistant settings — defaults, environment fallbacks, YAML load/save.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::Scope;

/// Errors raised while loading or persisting settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One camera the host exposes to capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Settings the host passes into every [`crate::ExecutionContext`].
///
/// Every field has a default so a missing or partial settings file still
/// yields a working configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    /// Widest scope the host grants. A query's scope prefix can only narrow it.
    #[serde(default = "default_scope")]
    pub default_scope: Scope,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    /// Message-broker endpoint for device presence, when the host runs one.
    #[serde(default)]
    pub broker_url: Option<String>,
    /// Model name the catch-all conversational capability falls back to.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_assistant_name() -> String {
    "attendant".to_string()
}

fn default_scope() -> Scope {
    Scope::Local
}

fn default_fallback_model() -> String {
    env::var("ATTENDANT_FALLBACK_MODEL")
        .or_else(|_| env::var("FALLBACK_MODEL"))
        .unwrap_or_else(|_| "google/gemini-2.0-flash-exp:free".to_string())
}

fn default_history_limit() -> usize {
    500
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            assistant_name: default_assistant_name(),
            default_scope: default_scope(),
            cameras: Vec::new(),
            broker_url: None,
            fallback_model: default_fallback_model(),
            history_limit: default_history_limit(),
        }
    }
}

impl AssistantConfig {
    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load settings from a YAML file. A missing file is not an error: the
    /// defaults apply, with a log line noting the fallback.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "[config] no settings file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Persist settings to a YAML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Look up a camera by name.
    pub fn camera(&self, name: &str) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.name == name)
    }
}
