//! Configuration file support.
//!
//! Every key is optional and only supplies a default; command-line flags
//! take precedence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// Defaults read from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Query timeout in seconds.
    pub timeout: Option<u64>,

    /// UDP attempts per server.
    pub retries: Option<u32>,

    /// EDNS UDP payload size.
    pub bufsize: Option<u16>,

    /// Maximum simultaneous queries.
    pub parallel: Option<u32>,

    /// Destination port.
    pub port: Option<u16>,

    /// Always request NSID.
    pub nsid: bool,

    /// Always use TCP.
    pub tcp: bool,

    /// Alternate resolv.conf.
    pub resolv_conf: Option<PathBuf>,
}

impl Config {
    /// Default config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "checksoa", "check-soa").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicitly named file must exist; a missing default file means
    /// an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
