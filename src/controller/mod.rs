//! The adapter configuration state machine.
//!
//! This module provides:
//! - Adapter lifecycle states ([`AdapterState`])
//! - The configuration controller ([`ConfigController`])
//! - Decided adapter calls ([`AdapterCall`], [`AdapterCallKind`])
//! - The published request handle ([`ReconfigureHandle`])
//! - Error handling ([`ControllerError`])
//!
//! # Sequencing
//!
//! The controller owns the applied argument set and an optional pending
//! accumulator. Requests arriving while a call is outstanding are folded
//! into the pending set by successive merges; they are never queued
//! individually and never trigger an adapter call directly. The state
//! machine cycles `Unconfigured -> Configuring -> Configured ->
//! Configuring -> ...` and never issues overlapping calls.
//!
//! An adapter call is decomposed into [`ConfigController::begin`] and
//! [`ConfigController::complete`] so that requests can interleave with the
//! awaited call; [`ConfigController::drive`] combines both for callers
//! that do not need to interleave.

mod handle;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use handle::{ReconfigureHandle, ReconfigureRequest, reconfigure_channel};

use thiserror::Error;

use crate::adapter::{AdapterError, FlagAdapter};
use crate::args::{AdapterArgs, FlagSet, ReconfigureOptions};

/// Lifecycle state of the adapter, as tracked by the controller.
///
/// Owned exclusively by the controller; mutated only through the internal
/// transition function. External readers see it via
/// [`ConfigController::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// No configure call has been issued yet.
    Unconfigured,
    /// A configure or reconfigure call is outstanding.
    Configuring,
    /// The adapter has completed configuration and is ready.
    Configured,
}

/// Events that drive state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateEvent {
    /// A configure/reconfigure call was issued to the adapter.
    CallIssued,
    /// The outstanding call resolved successfully.
    CallCompleted,
}

impl AdapterState {
    /// Applies an event to this state.
    ///
    /// Returns the next state, or `None` for illegal pairs. Illegal pairs
    /// are guarded no-ops at the call sites, never errors: issuing a call
    /// while one is outstanding must be silently impossible, not a
    /// reportable failure.
    const fn next(self, event: StateEvent) -> Option<Self> {
        match (self, event) {
            (Self::Unconfigured | Self::Configured, StateEvent::CallIssued) => {
                Some(Self::Configuring)
            }
            (Self::Configuring, StateEvent::CallCompleted) => Some(Self::Configured),
            _ => None,
        }
    }
}

/// Which adapter entry point a decided call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterCallKind {
    /// First-time setup via [`FlagAdapter::configure`].
    Configure,
    /// Subsequent setup via [`FlagAdapter::reconfigure`].
    Reconfigure,
}

/// A decided adapter call: which entry point to invoke, with which
/// argument snapshot.
///
/// Returned by [`ConfigController::begin`]; the caller awaits the matching
/// adapter method and then calls [`ConfigController::complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCall {
    kind: AdapterCallKind,
    args: AdapterArgs,
}

impl AdapterCall {
    /// The entry point to invoke.
    #[must_use]
    pub const fn kind(&self) -> AdapterCallKind {
        self.kind
    }

    /// The argument snapshot to pass to the adapter.
    #[must_use]
    pub const fn args(&self) -> &AdapterArgs {
        &self.args
    }
}

/// Error type for controller-driven adapter calls.
///
/// There is no retry or recovery layer: a failed call leaves the
/// controller in [`AdapterState::Configuring`] for the lifetime of the
/// instance, and recovery is the caller's responsibility.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The adapter's configure call failed.
    #[error("Adapter configure call failed: {0}")]
    Configure(#[source] AdapterError),

    /// The adapter's reconfigure call failed.
    #[error("Adapter reconfigure call failed: {0}")]
    Reconfigure(#[source] AdapterError),
}

/// Sequences configuration and reconfiguration calls against an adapter.
///
/// The controller assumes a single logical thread of control: all state
/// mutation happens through `&mut self`, and suspension occurs only at
/// the awaited adapter call. Requests accepted between [`begin`] and
/// [`complete`] are captured in the pending accumulator and drained into
/// the applied set when the call resolves.
///
/// # Example
///
/// ```ignore
/// use flagctl::adapter::LogAdapter;
/// use flagctl::args::AdapterArgs;
/// use flagctl::controller::ConfigController;
///
/// let mut controller = ConfigController::new(seed_args);
/// controller.startup(&adapter).await?;
/// // later, on each argument-change event:
/// controller.handle_args_change(new_args);
/// controller.drive(&adapter).await?;
/// ```
///
/// [`begin`]: ConfigController::begin
/// [`complete`]: ConfigController::complete
pub struct ConfigController {
    state: AdapterState,
    /// The committed argument set; passed to the adapter on the next call
    /// unless a pending set exists.
    applied: AdapterArgs,
    /// Argument state not yet seen by the adapter. `None` when no
    /// reconfiguration is queued.
    pending: Option<AdapterArgs>,
    defer_configuration: bool,
    /// Consumed by the one-shot bootstrap at startup.
    default_flags: FlagSet,
}

impl ConfigController {
    /// Creates a controller seeded with the given argument set.
    ///
    /// The seed is not validated; malformed argument sets are the
    /// adapter's concern.
    #[must_use]
    pub fn new(adapter_args: AdapterArgs) -> Self {
        Self {
            state: AdapterState::Unconfigured,
            applied: adapter_args,
            pending: None,
            defer_configuration: false,
            default_flags: FlagSet::new(),
        }
    }

    /// Defers the first configure call to an external trigger.
    ///
    /// With deferral enabled, [`startup`](Self::startup) never calls
    /// `configure`; requests queue into the pending set until something
    /// else drives the first call.
    #[must_use]
    pub const fn with_deferred_configuration(mut self, defer: bool) -> Self {
        self.defer_configuration = defer;
        self
    }

    /// Sets the default flags pushed once to the adapter at startup.
    #[must_use]
    pub fn with_default_flags(mut self, flags: FlagSet) -> Self {
        self.default_flags = flags;
        self
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> AdapterState {
        self.state
    }

    /// Returns the committed argument set.
    #[must_use]
    pub const fn applied_args(&self) -> &AdapterArgs {
        &self.applied
    }

    /// Returns the queued-not-yet-delivered argument set, if any.
    #[must_use]
    pub const fn pending_args(&self) -> Option<&AdapterArgs> {
        self.pending.as_ref()
    }

    /// Requests that the adapter be reconfigured with `args`.
    ///
    /// Safe to call at any time, in any state, including while a call is
    /// outstanding. Never fails and never triggers an adapter call
    /// directly:
    /// - While [`AdapterState::Configured`], the request commits into the
    ///   applied set synchronously; the next scheduler event issues the
    ///   reconfigure call.
    /// - Otherwise it merges into the pending set, seeded from the
    ///   applied set on the first queued request.
    pub fn request_reconfiguration(&mut self, args: AdapterArgs, options: ReconfigureOptions) {
        if matches!(self.state, AdapterState::Configured) {
            let previous = std::mem::take(&mut self.applied);
            self.applied = previous.merged(args, options);
            tracing::debug!("Reconfiguration committed");
        } else {
            let base = self
                .pending
                .take()
                .unwrap_or_else(|| self.applied.clone());
            self.pending = Some(base.merged(args, options));
            tracing::debug!(state = ?self.state, "Reconfiguration queued");
        }
    }

    /// Adapts an external argument change into a reconfiguration request.
    ///
    /// Caller-driven changes overwrite once the adapter is configured, so
    /// they take priority over anything committed earlier; before
    /// readiness they merge, preserving whatever was queued.
    pub fn handle_args_change(&mut self, args: AdapterArgs) {
        let overwrite = matches!(self.state, AdapterState::Configured);
        self.request_reconfiguration(args, ReconfigureOptions { overwrite });
    }

    /// Decides whether an adapter call should be issued now.
    ///
    /// Transitions into [`AdapterState::Configuring`] and returns the call
    /// to make, with the pending snapshot if one exists, else the applied
    /// set. Returns `None` when:
    /// - a call is already outstanding (re-entrancy guard), or
    /// - the first configure is deferred and none has happened yet.
    pub fn begin(&mut self) -> Option<AdapterCall> {
        let kind = match self.state {
            AdapterState::Unconfigured => {
                if self.defer_configuration {
                    return None;
                }
                AdapterCallKind::Configure
            }
            AdapterState::Configured => AdapterCallKind::Reconfigure,
            AdapterState::Configuring => return None,
        };

        self.state = self.state.next(StateEvent::CallIssued)?;

        let args = self
            .pending
            .clone()
            .unwrap_or_else(|| self.applied.clone());

        tracing::debug!(kind = ?kind, "Adapter call issued");
        Some(AdapterCall { kind, args })
    }

    /// Records successful completion of the outstanding adapter call.
    ///
    /// Transitions back to [`AdapterState::Configured`] and drains the
    /// pending set into the applied set. Draining happens on every
    /// successful completion, configure and reconfigure alike, so a
    /// request that raced the call is committed exactly once.
    ///
    /// Calling this with no call outstanding is a no-op.
    pub fn complete(&mut self) {
        let Some(next) = self.state.next(StateEvent::CallCompleted) else {
            return;
        };
        self.state = next;

        if let Some(pending) = self.pending.take() {
            self.applied = pending;
            tracing::debug!("Pending arguments drained into applied set");
        }
    }

    /// Issues the next adapter call, if one is due, and awaits it.
    ///
    /// Returns `Ok(true)` if a call was made, `Ok(false)` if nothing was
    /// due. On failure the controller stays in
    /// [`AdapterState::Configuring`] and the error propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter's configure or reconfigure call
    /// fails.
    pub async fn drive<A: FlagAdapter>(&mut self, adapter: &A) -> Result<bool, ControllerError> {
        let Some(call) = self.begin() else {
            return Ok(false);
        };

        match call.kind() {
            AdapterCallKind::Configure => adapter
                .configure(call.args())
                .await
                .map_err(ControllerError::Configure)?,
            AdapterCallKind::Reconfigure => adapter
                .reconfigure(call.args())
                .await
                .map_err(ControllerError::Reconfigure)?,
        }

        self.complete();
        Ok(true)
    }

    /// Runs the startup sequence.
    ///
    /// Pushes the default flags to the adapter's flag-change sink (a
    /// one-shot side effect, before and independent of any configure
    /// call), then issues the first configure call unless configuration
    /// is deferred.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter's configure call fails.
    pub async fn startup<A: FlagAdapter>(&mut self, adapter: &A) -> Result<(), ControllerError> {
        let flags = std::mem::take(&mut self.default_flags);
        if !flags.is_empty() {
            adapter.on_flags_state_change(&flags);
        }

        if self.defer_configuration {
            tracing::debug!("Initial configuration deferred");
            return Ok(());
        }

        self.drive(adapter).await?;
        Ok(())
    }
}
