// rust/ckpt-core/src/config.rs

//! Client configuration.
//!
//! Parsed from TOML, with environment variable overrides and validation.
//! A configuration that fails to load or validate prevents the client from
//! being constructed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CkptError, Result};
use crate::storage::DEFAULT_BUFFER_SIZE;

/// How descriptors reach the persistence side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// In-process modules, invoked directly and awaited.
    #[default]
    Sync,
    /// Out-of-process engine reached over a command channel.
    Async,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = CkptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            other => Err(CkptError::config(format!(
                "mode must be 'sync' or 'async', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // Scratch directory where artifacts are written and read.
    pub scratch: PathBuf,
    /// Persistent tier the transfer module copies artifacts to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<PathBuf>,
    pub mode: DispatchMode,
    // Versions kept per checkpoint name; 0 keeps all of them.
    pub max_versions: usize,
    // Buffer size in bytes for artifact I/O.
    pub buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scratch: PathBuf::from("./scratch"),
            persistent: None,
            mode: DispatchMode::Sync,
            max_versions: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl FromStr for ClientConfig {
    type Err = CkptError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| CkptError::config_with_source("failed to parse TOML config", e))
    }
}

impl ClientConfig {
    /// Convenience constructor for a scratch directory and mode.
    pub fn new(scratch: impl Into<PathBuf>, mode: DispatchMode) -> Self {
        Self {
            scratch: scratch.into(),
            mode,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: impl Into<PathBuf>) -> Self {
        self.persistent = Some(persistent.into());
        self
    }

    #[must_use]
    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions;
        self
    }

    pub fn is_sync(&self) -> bool {
        self.mode == DispatchMode::Sync
    }

    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CkptError::config_with_source(
                format!("failed to read config file {}", path.display()),
                e,
            )
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // - `CKPT_SCRATCH` overrides `scratch`
    // - `CKPT_PERSISTENT` overrides `persistent`
    // - `CKPT_MODE` overrides `mode` ("sync" or "async")
    // - `CKPT_MAX_VERSIONS` overrides `max_versions`
    // - `CKPT_BUFFER_SIZE` overrides `buffer_size`
    //
    // Values that do not parse are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CKPT_SCRATCH") {
            self.scratch = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CKPT_PERSISTENT") {
            self.persistent = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("CKPT_MODE") {
            if let Ok(mode) = val.parse() {
                self.mode = mode;
            }
        }
        if let Ok(val) = std::env::var("CKPT_MAX_VERSIONS") {
            if let Ok(v) = val.parse() {
                self.max_versions = v;
            }
        }
        if let Ok(val) = std::env::var("CKPT_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.buffer_size = v;
            }
        }
        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scratch.as_os_str().is_empty() {
            return Err(CkptError::config("scratch must not be empty"));
        }

        if let Some(persistent) = &self.persistent {
            if persistent.as_os_str().is_empty() {
                return Err(CkptError::config("persistent must not be empty when set"));
            }
            if persistent == &self.scratch {
                return Err(CkptError::config("persistent must differ from scratch"));
            }
        }

        if self.buffer_size == 0 {
            return Err(CkptError::config("buffer_size must be greater than 0"));
        }

        Ok(())
    }
}
