//! Application execution logic.
//!
//! This module contains the driver loop: it runs the controller's
//! startup sequence, then folds reconfiguration requests and
//! argument-change events into the controller and drives adapter calls.

use thiserror::Error;
use tokio::signal;
use tokio_stream::StreamExt;

use flagctl::adapter::{FlagAdapter, LogAdapter};
use flagctl::config::ValidatedConfig;
use flagctl::controller::{ConfigController, ControllerError, ReconfigureRequest, reconfigure_channel};
use flagctl::watch::{ArgsWatcher, FileArgsSource};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// An adapter configure/reconfigure call failed.
    ///
    /// Fatal for this controller instance: the state machine is stuck
    /// mid-configuration and only a restart recovers it.
    #[error("Adapter configuration failed: {0}")]
    Controller(#[from] ControllerError),
}

/// A single driver-loop event.
#[derive(Debug)]
enum LoopEvent {
    /// A reconfiguration request arrived on the published handle.
    Request(ReconfigureRequest),
    /// The watched configuration file carries a new argument set.
    ArgsChanged(flagctl::args::AdapterArgs),
}

/// Executes the main application loop.
///
/// This function:
/// 1. Builds the controller from the validated configuration
/// 2. Runs the startup sequence (default-flags bootstrap + first configure)
/// 3. Watches the configuration file for argument changes
/// 4. Runs the event loop until shutdown signal (Ctrl+C)
///
/// # Errors
///
/// Returns an error if an adapter configure/reconfigure call fails.
///
/// # Coverage Note
///
/// Excluded from coverage because it requires a real async runtime with
/// signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    run_loop(config, &LogAdapter::new(), shutdown_signal()).await
}

/// Runs the driver loop against an arbitrary adapter.
///
/// Split from [`execute`] so tests can inject a mock adapter and a
/// controllable shutdown future.
async fn run_loop<A, F>(config: ValidatedConfig, adapter: &A, shutdown: F) -> Result<(), RunError>
where
    A: FlagAdapter,
    F: Future<Output = ()>,
{
    let mut controller = build_controller(&config);

    // Published request surface. The standalone binary embeds no
    // consumers of its own; embedders reusing this loop hand out clones
    // of the handle.
    let (handle, mut requests) = reconfigure_channel();
    tracing::debug!(connected = handle.is_connected(), "Reconfiguration handle ready");

    controller.startup(adapter).await?;
    tracing::info!(ready = adapter.is_ready(), "Controller started");

    let source = FileArgsSource::new(&config.config_path);
    let watcher = ArgsWatcher::new(source, config.watch_interval)
        .with_baseline(config.adapter_args.clone());
    let mut changes = watcher.into_stream();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(());
            }

            Some(request) = requests.recv() => {
                handle_event(&mut controller, adapter, LoopEvent::Request(request)).await?;
            }

            Some(args) = changes.next() => {
                handle_event(&mut controller, adapter, LoopEvent::ArgsChanged(args)).await?;
            }
        }
    }
}

/// Builds the controller from validated configuration.
fn build_controller(config: &ValidatedConfig) -> ConfigController {
    ConfigController::new(config.adapter_args.clone())
        .with_deferred_configuration(config.defer_configuration)
        .with_default_flags(config.default_flags.clone())
}

/// Folds one event into the controller, then drives the next adapter call.
async fn handle_event<A: FlagAdapter>(
    controller: &mut ConfigController,
    adapter: &A,
    event: LoopEvent,
) -> Result<(), RunError> {
    match event {
        LoopEvent::Request(request) => {
            tracing::debug!("Reconfiguration requested");
            controller.request_reconfiguration(request.args, request.options);
        }
        LoopEvent::ArgsChanged(args) => {
            tracing::info!("Adapter arguments changed");
            controller.handle_args_change(args);
        }
    }

    controller.drive(adapter).await?;

    // Readiness is re-derived from the adapter on every evaluation, never
    // cached in the controller.
    tracing::debug!(
        ready = adapter.is_ready(),
        state = ?controller.state(),
        "Evaluation complete"
    );
    Ok(())
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
