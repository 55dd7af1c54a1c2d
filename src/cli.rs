//! Command-line argument parsing for the scoped console.

use crate::config::{Config, ConsoleConfig};
use clap::Parser;
use std::path::PathBuf;

/// An interactive console of scoped, dot-addressable commands.
#[derive(Parser, Debug)]
#[command(name = "scoped-console")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Let unhandled command failures propagate (debug configuration)
    #[arg(long)]
    pub debug: bool,

    /// Execute a command path and exit (repeatable, runs in order)
    #[arg(short = 'e', long = "execute", value_name = "PATH")]
    pub execute: Vec<String>,

    /// Path to a script file with one command path per line (use "-" for stdin)
    #[arg(long, value_name = "PATH")]
    pub script: Option<String>,

    /// Characters that keep a following '.' inside a path segment
    #[arg(long, value_name = "CHARS")]
    pub escape_chars: Option<String>,

    /// Write tracing output to this file instead of stderr
    #[arg(long, value_name = "PATH", env = "SCOPED_CONSOLE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut ConsoleConfig) {
        if self.debug {
            config.debug = true;
        }
        if let Some(chars) = &self.escape_chars {
            config.escape_chars = chars.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }

    /// Returns true if the console should run commands and exit instead of
    /// reading interactive input.
    pub fn is_batch(&self) -> bool {
        !self.execute.is_empty() || self.script.is_some()
    }
}
