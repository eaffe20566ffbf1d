//! Development adapter that logs configuration calls.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{AdapterError, FlagAdapter};
use crate::args::{AdapterArgs, FlagSet};

/// An adapter that accepts every configuration and logs it via tracing.
///
/// Used by the `flagctl` binary as a stand-in for a real flag provider,
/// so the controller's sequencing can be observed end to end without a
/// provider backend. Reports ready after the first successful configure.
#[derive(Debug, Default)]
pub struct LogAdapter {
    ready: AtomicBool,
}

impl LogAdapter {
    /// Creates a new logging adapter in the not-ready state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }
}

impl FlagAdapter for LogAdapter {
    async fn configure(&self, args: &AdapterArgs) -> Result<(), AdapterError> {
        tracing::info!("Adapter configured: {args:?}");
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reconfigure(&self, args: &AdapterArgs) -> Result<(), AdapterError> {
        tracing::info!("Adapter reconfigured: {args:?}");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn on_flags_state_change(&self, flags: &FlagSet) {
        tracing::info!("Default flags pushed: {} flag(s)", flags.len());
    }
}
