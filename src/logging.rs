//! Tracing setup.
//!
//! Batch runs trace to stderr. Interactive sessions trace to a file so the
//! output never interleaves with the console's own lines. `RUST_LOG`
//! overrides the default filter in either case.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::error::{ConsoleError, Result};

const LOG_DIR: &str = "scoped-console";
const LOG_FILE: &str = "scoped-console.log";

/// Where tracing output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// A configured file always wins. Without one, interactive sessions use
    /// [`default_log_path`] and batch runs use stderr.
    pub fn select(configured: Option<&Path>, interactive: bool) -> Self {
        match configured {
            Some(path) => Self::File(path.to_path_buf()),
            None if interactive => Self::File(default_log_path()),
            None => Self::Stderr,
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_directive(debug: bool) -> &'static str {
    if debug {
        "scoped_console=debug,info"
    } else {
        "info"
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)))
}

/// Opens `path` for writing, creating missing parent directories.
///
/// The file is truncated on each run.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ConsoleError::runtime(format!(
                "Could not create log directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    File::create(path).map_err(|e| {
        ConsoleError::runtime(format!("Could not create log file {}: {e}", path.display()))
    })
}

/// Installs the global subscriber for `target`.
pub fn init(target: &LogTarget, debug: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(debug));
    let installed = match target {
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
        LogTarget::File(path) => builder
            .with_writer(open_log_file(path)?)
            .with_ansi(false)
            .try_init(),
    };
    installed.map_err(|e| ConsoleError::runtime(format!("Could not install logger: {e}")))
}

/// Default log file: the XDG state directory on Linux, else the config
/// directory, else the temp directory.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join(LOG_DIR).join(LOG_FILE))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE))
}
