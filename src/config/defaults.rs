//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default configuration file name, used when `--config` is not given.
pub const CONFIG_FILE: &str = "flagctl.toml";

/// Default interval in seconds between argument-change checks.
pub const WATCH_INTERVAL_SECS: u64 = 5;

/// Default argument-change check interval as Duration.
#[must_use]
pub const fn watch_interval() -> Duration {
    Duration::from_secs(WATCH_INTERVAL_SECS)
}
