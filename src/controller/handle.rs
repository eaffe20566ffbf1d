//! Published reconfiguration-request handle.
//!
//! Parts of the system outside the controller's owner request
//! reconfiguration through a cloneable [`ReconfigureHandle`] backed by an
//! unbounded channel; the driver loop drains the receiver into
//! [`ConfigController::request_reconfiguration`].
//!
//! [`ConfigController::request_reconfiguration`]: super::ConfigController::request_reconfiguration

use tokio::sync::mpsc;

use crate::args::{AdapterArgs, ReconfigureOptions};

/// A reconfiguration request in flight toward the controller's driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconfigureRequest {
    /// The new argument set.
    pub args: AdapterArgs,
    /// Merge policy for this request.
    pub options: ReconfigureOptions,
}

/// Cloneable handle for requesting adapter reconfiguration.
///
/// The default handle is disconnected: requests made before a controller
/// driver exists are a silent no-op, not an error. Requests sent after
/// the driver shuts down are likewise dropped.
#[derive(Debug, Clone, Default)]
pub struct ReconfigureHandle {
    tx: Option<mpsc::UnboundedSender<ReconfigureRequest>>,
}

impl ReconfigureHandle {
    /// A handle not connected to any controller.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Requests that the adapter be reconfigured with `args`.
    ///
    /// Non-blocking and infallible; delivery is best-effort in the sense
    /// that a missing or stopped driver drops the request silently.
    pub fn request(&self, args: AdapterArgs, options: ReconfigureOptions) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ReconfigureRequest { args, options });
        }
    }

    /// Returns true if this handle is wired to a driver channel.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.tx.is_some()
    }
}

/// Creates a connected handle and the receiver its requests arrive on.
#[must_use]
pub fn reconfigure_channel() -> (
    ReconfigureHandle,
    mpsc::UnboundedReceiver<ReconfigureRequest>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReconfigureHandle { tx: Some(tx) }, rx)
}
