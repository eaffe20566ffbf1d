//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde. The same
//! file doubles as the argument source watched at runtime: the
//! `[adapter_args]` table is re-read on every watch tick.

use std::path::Path;

use serde::Deserialize;

use crate::args::{AdapterArgs, FlagSet};

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Interval in seconds between argument-change checks
    pub watch_interval: Option<u64>,

    /// Defer the initial adapter configuration to an external trigger
    pub defer_configuration: Option<bool>,

    /// Default flags pushed once to the adapter at startup
    pub default_flags: Option<FlagSet>,

    /// Arguments passed to the adapter's configure/reconfigure calls.
    /// Arbitrary nested table; the controller does not interpret it.
    pub adapter_args: Option<AdapterArgs>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# flagctl Configuration File

# Interval in seconds between checks of this file for adapter_args
# changes (default: 5)
# watch_interval = 5

# Defer the initial adapter configuration to an external trigger
# (default: false)
# defer_configuration = false

# Default flags pushed once to the adapter at startup, before the first
# configure call
# [default_flags]
# beta_banner = true

# Arguments passed to the adapter's configure/reconfigure calls
# (required). Arbitrary nested tables are forwarded verbatim.
[adapter_args]
client_key = "your-client-key"

[adapter_args.user]
id = "anonymous"
"#
    .to_string()
}
