//! Forge configuration (forge.toml)
//!
//! Every table and key is optional; a missing file is the same as an empty one.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::printer::FormatConfig;
use crate::rewriter::RewriteConfig;

pub const CONFIG_FILE_NAME: &str = "forge.toml";

/// Parsed forge.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub runtime: RuntimeSettings,
    pub rewrite: RewriteConfig,
    pub terminal: TerminalSettings,
    pub format: FormatConfig,
}

/// `[runtime]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Deepest call nesting before a RecursionError
    pub max_call_depth: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { max_call_depth: 200 }
    }
}

/// `[terminal]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Prefix of the echo chunk written after a submitted line
    pub echo_prefix: String,

    /// Print a `$ forge run <file>` banner as each run's first chunk
    pub banner: bool,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            echo_prefix: "›".to_string(),
            banner: false,
        }
    }
}

impl ForgeConfig {
    /// Parse a configuration from TOML text
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e)))
    }

    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Search `start_dir` and its parents for forge.toml
    ///
    /// Returns the defaults (and no path) when none is found.
    pub fn discover(start_dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok((Self::from_file(&candidate)?, Some(candidate)));
            }
            if !current.pop() {
                return Ok((Self::default(), None));
            }
        }
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}
