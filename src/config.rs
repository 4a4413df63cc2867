//! Session configuration, read from `.callpath.toml`.
//!
//! Every field has a default, so a missing file (or a missing section)
//! behaves exactly like an empty one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CallpathError, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".callpath.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallpathConfig {
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
}

/// Defaults for `callers`, `callees` and `paths` when no flag is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub include_external: bool,
    pub include_ref: bool,
    /// Maximum number of paths printed by `paths`.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where `save` writes when called without a file argument.
    pub default_dump: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Abort a script at the first failing command.
    pub stop_on_error: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_on_error: true,
        }
    }
}

impl CallpathConfig {
    /// Load the config from `path`, falling back to defaults if the file is
    /// missing or invalid.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(CallpathError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Strict variant of [`CallpathConfig::load`].
    pub fn try_load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CallpathError::Config(e.to_string()))
    }
}
