//! Restart orchestration: cycles, debouncing, shutdown and the run loop.

mod coordinator;
mod debounce;
mod error;
mod regenerate;
mod runner;
mod shutdown;

pub use coordinator::{
    CycleReport, CycleTrigger, RegenerateOutcome, RestartCoordinator, REPORT_CHANNEL_CAPACITY,
};
pub use debounce::Debouncer;
pub use error::OrchestratorError;
pub use regenerate::{CommandRegenerator, RegenerateError, Regenerator};
pub use runner::Orchestrator;
pub use shutdown::{wait_for_shutdown_signal, ShutdownController, ShutdownReason};
