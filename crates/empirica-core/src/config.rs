use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration passed into the cascade constructor.
///
/// Loadable from a TOML file at [`EmpiricaConfig::default_path`], or built
/// purely in-process for embedding — nothing in this crate reads it off disk
/// implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmpiricaConfig {
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for EmpiricaConfig {
    fn default() -> Self {
        Self {
            cascade: CascadeConfig::default(),
            checkpoint: CheckpointConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl EmpiricaConfig {
    /// Load config from `~/.empirica/config.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(EmpiricaConfig::default())
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".empirica")
            .join("config.toml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

/// Cascade-flow knobs. A [`crate::config::CascadeConfig`] can be overridden
/// per-persona by the investigation profile selector (see `empirica-persona`);
/// these are the defaults used when no persona is bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    #[serde(default = "default_engagement_gate")]
    pub engagement_gate: f64,
    #[serde(default = "default_max_investigation_rounds")]
    pub max_investigation_rounds: u32,
    #[serde(default = "default_confidence_to_proceed")]
    pub confidence_to_proceed: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            engagement_gate: default_engagement_gate(),
            max_investigation_rounds: default_max_investigation_rounds(),
            confidence_to_proceed: default_confidence_to_proceed(),
        }
    }
}

fn default_engagement_gate() -> f64 {
    0.60
}
fn default_max_investigation_rounds() -> u32 {
    7
}
fn default_confidence_to_proceed() -> f64 {
    0.70
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_size_budget")]
    pub size_budget_bytes: usize,
    #[serde(default = "default_note_ref_root")]
    pub note_ref_root: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            size_budget_bytes: default_checkpoint_size_budget(),
            note_ref_root: default_note_ref_root(),
        }
    }
}

fn default_checkpoint_size_budget() -> usize {
    600
}
fn default_note_ref_root() -> String {
    "refs/notes/empirica/checkpoints".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub auto_sign_checkpoints: bool,
    #[serde(default = "default_identity_dir")]
    pub identity_dir: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            auto_sign_checkpoints: false,
            identity_dir: default_identity_dir(),
        }
    }
}

fn default_identity_dir() -> String {
    "~/.empirica/identities".into()
}
