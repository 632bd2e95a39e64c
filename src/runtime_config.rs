//! # Runtime Configuration Module
//!
//! Router behaviour knobs, loaded from environment variables or a TOML file.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `SEGROUTE_PATH_CORRECTION` | `path_correction` | `true` |
//! | `SEGROUTE_ENFORCE_CONSTRAINTS` | `enforce_constraints` | `false` |
//! | `SEGROUTE_SLOW_MATCH_US` | `slow_match_threshold_us` | `1000` |
//! | `SEGROUTE_LOG_LEVEL` | `log.level` | `info` |
//! | `SEGROUTE_LOG_FORMAT` | `log.format` | `json` |
//! | `SEGROUTE_LOG_TARGETS` | `log.target_filter` | unset |
//!
//! Unparsable values fall back to the default.
//!
//! ## TOML
//!
//! ```toml
//! path_correction = false
//! enforce_constraints = true
//! slow_match_threshold_us = 250
//!
//! [log]
//! level = "debug"
//! format = "pretty"
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use segroute::runtime_config::RouterConfig;
//!
//! let config = RouterConfig::from_toml_str("enforce_constraints = true").unwrap();
//! assert!(config.enforce_constraints);
//! assert!(config.path_correction);
//! ```

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::logging::LogConfig;

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Redirect a 404 to the same path with its trailing slash toggled when that resolves
    pub path_correction: bool,
    /// Treat `:name(tag)` constraint tags as anchored regular expressions
    pub enforce_constraints: bool,
    /// Matches slower than this are logged at warn level
    pub slow_match_threshold_us: u64,
    pub log: LogConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            path_correction: true,
            enforce_constraints: false,
            slow_match_threshold_us: 1000,
            log: LogConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Override fields with `SEGROUTE_*` variables that are set and parse
    #[must_use]
    pub fn merge_env(mut self) -> Self {
        if let Some(v) = env_flag("SEGROUTE_PATH_CORRECTION") {
            self.path_correction = v;
        }
        if let Some(v) = env_flag("SEGROUTE_ENFORCE_CONSTRAINTS") {
            self.enforce_constraints = v;
        }
        if let Some(v) = env::var("SEGROUTE_SLOW_MATCH_US")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            self.slow_match_threshold_us = v;
        }
        self.log = self.log.merge_env();
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse router config")
    }

    /// Read a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config.merge_env())
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
