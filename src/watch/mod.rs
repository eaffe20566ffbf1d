//! Polling-based detection of adapter-argument changes.
//!
//! The controller's scheduler is driven by explicit events rather than an
//! implicit evaluation tick. This module produces the "argument-set
//! changed" event: [`ArgsWatcher`] periodically re-reads an
//! [`ArgsSource`] and emits the new argument set whenever it differs from
//! the last one seen.

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Interval, interval};
use tokio_stream::Stream;

use crate::args::AdapterArgs;
use crate::config::{ConfigError, TomlConfig};

/// Errors reading an argument source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing configuration file could not be read or parsed.
    #[error("Failed to load argument source: {0}")]
    Config(#[from] ConfigError),

    /// The source parsed but carries no `adapter_args` table.
    #[error("Argument source has no adapter_args table")]
    MissingArgs,
}

/// Abstraction over where adapter arguments are re-read from.
///
/// # Testing
///
/// Implement this on a mock to feed scripted argument sets to the watcher.
pub trait ArgsSource {
    /// Fetches the current argument set.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed. The
    /// watcher treats these as transient and keeps polling.
    fn fetch(&self) -> Result<AdapterArgs, SourceError>;
}

/// Reads adapter arguments from the `[adapter_args]` table of a TOML
/// configuration file.
#[derive(Debug)]
pub struct FileArgsSource {
    path: PathBuf,
}

impl FileArgsSource {
    /// Creates a source backed by the given configuration file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the watched file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArgsSource for FileArgsSource {
    fn fetch(&self) -> Result<AdapterArgs, SourceError> {
        let config = TomlConfig::load(&self.path)?;
        config.adapter_args.ok_or(SourceError::MissingArgs)
    }
}

/// A stream of changed argument sets produced by polling a source.
///
/// Yields an [`AdapterArgs`] whenever a fetch returns a set that differs
/// from the previous one. Fetch errors are swallowed so a transient read
/// failure never terminates the stream.
pub struct ArgsStream<S> {
    source: S,
    interval: Interval,
    /// Last set seen; the next emission requires a difference from this.
    last_seen: Option<AdapterArgs>,
}

impl<S: ArgsSource + Unpin> Stream for ArgsStream<S> {
    type Item = AdapterArgs;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // Poll the interval timer - registers waker for next tick when Pending
            if Pin::new(&mut self.interval).poll_tick(cx).is_pending() {
                return Poll::Pending;
            }

            match self.source.fetch() {
                Ok(args) => {
                    if self.last_seen.as_ref() != Some(&args) {
                        self.last_seen = Some(args.clone());
                        return Poll::Ready(Some(args));
                    }
                    // Unchanged - loop back to re-register waker via poll_tick
                }
                Err(e) => {
                    // Transient by assumption; keep polling.
                    tracing::warn!("Argument source read failed: {e}");
                }
            }
        }
    }
}

/// Polling watcher over an argument source.
///
/// # Example
///
/// ```ignore
/// use flagctl::watch::{ArgsWatcher, FileArgsSource};
/// use std::time::Duration;
///
/// let source = FileArgsSource::new("flagctl.toml");
/// let watcher = ArgsWatcher::new(source, Duration::from_secs(5))
///     .with_baseline(initial_args);
///
/// let mut changes = watcher.into_stream();
/// while let Some(args) = changes.next().await {
///     // feed into the controller
/// }
/// ```
pub struct ArgsWatcher<S> {
    source: S,
    interval: Duration,
    baseline: Option<AdapterArgs>,
}

impl<S: ArgsSource> ArgsWatcher<S> {
    /// Creates a watcher polling `source` at the given interval.
    ///
    /// Without a baseline, the first successful fetch is emitted as a
    /// change.
    #[must_use]
    pub const fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            baseline: None,
        }
    }

    /// Seeds the watcher with an already-known argument set.
    ///
    /// Fetches equal to the baseline are not emitted, so the set the
    /// controller was constructed with does not immediately re-trigger a
    /// reconfiguration.
    #[must_use]
    pub fn with_baseline(mut self, args: AdapterArgs) -> Self {
        self.baseline = Some(args);
        self
    }

    /// Returns the configured polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Converts this watcher into a stream of changed argument sets.
    ///
    /// The stream never terminates on its own; use `take_until` with a
    /// shutdown signal to stop it gracefully.
    #[must_use]
    pub fn into_stream(self) -> ArgsStream<S> {
        ArgsStream {
            source: self.source,
            interval: interval(self.interval),
            last_seen: self.baseline,
        }
    }
}
