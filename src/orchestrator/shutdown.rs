//! Shutdown path.
//!
//! Any source (OS signal, console quit, closed input) may request shutdown;
//! the first request wins and records its reason. The terminal stop runs at
//! most once no matter how many sources fire.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

use super::RestartCoordinator;

/// Why the orchestrator is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Interrupt, terminate or quit signal.
    Signal,
    /// `quit` typed at the console.
    Quit,
    /// Console input reached end of file or failed.
    InputClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Signal => "signal",
            Self::Quit => "quit command",
            Self::InputClosed => "input closed",
        })
    }
}

/// One-shot shutdown latch shared by every component.
#[derive(Debug, Default)]
pub struct ShutdownController {
    reason: OnceLock<ShutdownReason>,
    token: CancellationToken,
    stopped: AtomicBool,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for shutdown. Returns `true` for the first request only.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            tracing::info!(reason = %reason, "Shutdown requested");
        } else {
            tracing::debug!(reason = %reason, "Shutdown already requested");
        }
        self.token.cancel();
        first
    }

    /// Reason recorded by the first request.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled on the first request. Background tasks select on it.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait until shutdown is requested.
    pub async fn requested(&self) -> ShutdownReason {
        self.token.cancelled().await;
        // `request` sets the reason before cancelling.
        self.reason().unwrap_or(ShutdownReason::Signal)
    }

    /// Stop all services exactly once.
    ///
    /// Any cycle already running finishes first; cycles not yet started are
    /// refused. Returns `false` if the stop already ran.
    pub async fn execute(&self, coordinator: &RestartCoordinator) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        coordinator.begin_shutdown();
        let stopped = coordinator.stop_for_shutdown().await;
        tracing::info!(stopped, "All services stopped");
        true
    }
}

/// Wait for a termination signal.
///
/// # Errors
///
/// Returns an error if a signal listener cannot be registered.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Wait for a termination signal.
///
/// # Errors
///
/// Returns an error if the Ctrl-C listener cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
