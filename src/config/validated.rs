//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::args::{AdapterArgs, FlagSet};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::load`] to read the config file named by the CLI
/// (or the default path) and merge it with CLI arguments. CLI values take
/// precedence over TOML, which takes precedence over built-in defaults;
/// the `--defer` flag uses OR semantics with `defer_configuration` (the
/// flag can enable deferral but not disable it).
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Path of the loaded configuration file, watched at runtime for
    /// `adapter_args` changes.
    pub config_path: PathBuf,

    /// Seed arguments for the adapter (required).
    ///
    /// Required here at the application boundary only; the controller
    /// itself forwards whatever it is given and leaves validation to the
    /// adapter.
    pub adapter_args: AdapterArgs,

    /// Default flags pushed once at startup.
    pub default_flags: FlagSet,

    /// Whether the initial configure call is deferred.
    pub defer_configuration: bool,

    /// Interval between argument-change checks.
    pub watch_interval: Duration,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ file: {}, watch_interval: {}s, defer: {}, default_flags: {} }}",
            self.config_path.display(),
            self.watch_interval.as_secs(),
            self.defer_configuration,
            self.default_flags.len(),
        )
    }
}

impl ValidatedConfig {
    /// Loads and merges configuration from CLI and the config file.
    ///
    /// Uses `cli.config` if given, falling back to
    /// [`defaults::CONFIG_FILE`] in the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::CONFIG_FILE));

        let toml = TomlConfig::load(&path)?;
        Self::from_raw(cli, path, toml)
    }

    /// Creates a validated configuration from CLI arguments and a parsed
    /// TOML config.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `[adapter_args]` table is missing
    /// - The watch interval is zero
    pub fn from_raw(cli: &Cli, path: PathBuf, toml: TomlConfig) -> Result<Self, ConfigError> {
        let watch_interval = Self::resolve_watch_interval(cli, &toml)?;

        let adapter_args = toml.adapter_args.ok_or_else(|| {
            ConfigError::missing(
                field::ADAPTER_ARGS,
                "Add an [adapter_args] table to the config file",
            )
        })?;

        // OR semantics: either source can enable deferral.
        let defer_configuration = cli.defer || toml.defer_configuration.unwrap_or(false);

        Ok(Self {
            config_path: path,
            adapter_args,
            default_flags: toml.default_flags.unwrap_or_default(),
            defer_configuration,
            watch_interval,
            verbose: cli.verbose,
        })
    }

    fn resolve_watch_interval(cli: &Cli, toml: &TomlConfig) -> Result<Duration, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let seconds = cli
            .watch_interval
            .or(toml.watch_interval)
            .unwrap_or(defaults::WATCH_INTERVAL_SECS);

        if seconds == 0 {
            return Err(ConfigError::InvalidDuration {
                field: "watch_interval",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Duration::from_secs(seconds))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
