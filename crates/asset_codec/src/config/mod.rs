//! Configuration system
//!
//! Codec settings are plain serde structs persisted as TOML or RON; the file
//! extension picks the format.

pub use serde::{Serialize, Deserialize};

use std::path::PathBuf;

use crate::geometry::{QuadPolicy, SignatureStrategy, WeldOptions};
use crate::script::GeneratorOptions;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// # Codec Configuration
///
/// Everything one configuration load decides: where material scripts live,
/// how the generator signs its output, and which weld strategy and quad
/// policy the geometry codec runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Root directory scanned for `.material` and `.program` files
    pub script_dir: Option<PathBuf>,
    /// Tool name written into the generated header comment
    pub tool_name: String,
    /// Tool version written into the generated header comment
    pub tool_version: String,
    /// Weld signature strategy
    pub weld: SignatureStrategy,
    /// What to do with the fourth corner of quad faces
    pub quads: QuadPolicy,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            script_dir: None,
            tool_name: "asset_codec".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            weld: SignatureStrategy::default(),
            quads: QuadPolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config for CodecConfig {}

impl CodecConfig {
    /// Set the script directory
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    /// Set the weld strategy
    pub fn with_weld(mut self, weld: SignatureStrategy) -> Self {
        self.weld = weld;
        self
    }

    /// Set the quad policy
    pub fn with_quads(mut self, quads: QuadPolicy) -> Self {
        self.quads = quads;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tool_name.trim().is_empty() {
            return Err("Tool name cannot be empty".to_string());
        }
        if let Some(dir) = &self.script_dir {
            if !dir.is_dir() {
                return Err(format!("Script directory not found: {}", dir.display()));
            }
        }
        Ok(())
    }

    /// Generator options derived from this configuration
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            tool_name: self.tool_name.clone(),
            tool_version: self.tool_version.clone(),
        }
    }

    /// Weld options derived from this configuration
    pub fn weld_options(&self) -> WeldOptions {
        WeldOptions {
            strategy: self.weld,
            quads: self.quads,
        }
    }
}
