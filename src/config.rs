//! Application configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file, either `--config PATH` or `config.toml` in the platform
//!    config directory
//! 3. `DUPESCAN_*` environment variables
//! 4. command-line flags, applied by the caller
//!
//! ```toml
//! checkpoint_path = "/var/tmp/dupescan.json"
//! autosave_secs = 60
//! progress = false
//! resume = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read into [`Config`].
pub const ENV_PREFIX: &str = "DUPESCAN_";

/// Persistent defaults for the scan command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checkpoint file; the platform cache directory when unset
    pub checkpoint_path: Option<PathBuf>,
    /// Seconds between autosaves while scanning; 0 disables autosave
    pub autosave_secs: u64,
    /// Draw the live progress line
    pub progress: bool,
    /// Resume from an existing checkpoint
    pub resume: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_path: None,
            autosave_secs: 300,
            progress: true,
            resume: true,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Fails for a missing explicit file, invalid TOML, or values of the
    /// wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                ensure!(path.is_file(), "Config file not found: {}", path.display());
                Some(path.to_path_buf())
            }
            None => default_config_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            log::debug!("Reading config from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)).extract()?)
    }

    /// Autosave interval, `None` when disabled.
    #[must_use]
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_secs > 0).then(|| Duration::from_secs(self.autosave_secs))
    }
}

/// `config.toml` in the platform config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "dupescan", "dupescan")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
