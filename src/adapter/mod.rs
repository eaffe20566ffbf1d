//! The feature-flag adapter contract consumed by the controller.
//!
//! The adapter is an opaque external subsystem. This module only defines
//! the boundary:
//! - The async configuration contract ([`FlagAdapter`])
//! - Adapter-side failures ([`AdapterError`])
//! - A development implementation that logs its calls ([`LogAdapter`])

mod log;

pub use log::LogAdapter;

use thiserror::Error;

use crate::args::{AdapterArgs, FlagSet};

/// Errors reported by an adapter's configure/reconfigure calls.
///
/// The controller never retries or recovers from these; they propagate to
/// the caller and leave the controller mid-configuration (see the
/// controller module for the stuck-state semantics).
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The adapter rejected the supplied argument set.
    #[error("Adapter rejected the arguments: {reason}")]
    Rejected {
        /// Reason reported by the adapter
        reason: String,
    },

    /// The adapter's backing service could not be reached.
    #[error("Adapter unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },
}

/// Async contract of a pluggable feature-flag adapter.
///
/// Implementations must:
/// - Resolve `configure` only once the adapter is ready to serve
/// - Tolerate `reconfigure` being called any number of times after that
/// - Answer `is_ready` synchronously; the controller never caches it
///
/// The controller guarantees `configure`/`reconfigure` are never called
/// concurrently with themselves or each other.
///
/// # Testing
///
/// Use `mock::MockAdapter` in tests to capture calls and inject results.
pub trait FlagAdapter: Send + Sync {
    /// First-time setup. Must resolve when the adapter is ready to serve.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter rejects the arguments or cannot
    /// reach its backing service.
    fn configure(
        &self,
        args: &AdapterArgs,
    ) -> impl std::future::Future<Output = Result<(), AdapterError>> + Send;

    /// Subsequent setup with a new argument set.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter rejects the arguments or cannot
    /// reach its backing service.
    fn reconfigure(
        &self,
        args: &AdapterArgs,
    ) -> impl std::future::Future<Output = Result<(), AdapterError>> + Send;

    /// Synchronous readiness query.
    fn is_ready(&self) -> bool;

    /// Synchronous sink for bootstrap default flags.
    fn on_flags_state_change(&self, flags: &FlagSet);
}
