//! Configuration management for the scoped console.
//!
//! Handles loading configuration from TOML files. Every field has a default,
//! so a missing file or a missing section yields a working console.

use crate::commands::EscapeSet;
use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Console behaviour.
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Console configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Characters that stop a `.` from splitting a command path.
    #[serde(default = "default_escape_chars")]
    pub escape_chars: String,

    /// Lines kept in the console log.
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,

    /// Entries kept in the input history.
    #[serde(default = "default_max_input_history")]
    pub max_input_history: usize,

    /// Let unhandled command failures propagate instead of catching them.
    #[serde(default)]
    pub debug: bool,

    /// Module names that are never loaded.
    #[serde(default)]
    pub excluded_modules: Vec<String>,

    /// File receiving tracing output instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_escape_chars() -> String {
    "0123456789".to_string()
}

fn default_max_log_lines() -> usize {
    300
}

fn default_max_input_history() -> usize {
    50
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            escape_chars: default_escape_chars(),
            max_log_lines: default_max_log_lines(),
            max_input_history: default_max_input_history(),
            debug: false,
            excluded_modules: Vec::new(),
            log_file: None,
        }
    }
}

impl ConsoleConfig {
    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = self.escape_chars.chars().find(|c| *c == '.' || *c == ' ') {
            return Err(ConsoleError::config(format!(
                "escape_chars cannot contain '{c}'"
            )));
        }
        if self.max_log_lines == 0 {
            return Err(ConsoleError::config("max_log_lines must be at least 1"));
        }
        if self.max_input_history == 0 {
            return Err(ConsoleError::config("max_input_history must be at least 1"));
        }
        Ok(())
    }

    /// The escape set described by `escape_chars`.
    pub fn escape_set(&self) -> EscapeSet {
        EscapeSet::from_chars(self.escape_chars.chars())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scoped-console")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ConsoleError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.console.validate()?;
        Ok(config)
    }
}
