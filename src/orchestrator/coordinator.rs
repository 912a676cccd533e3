//! Restart coordinator.
//!
//! Serializes restart cycles behind one coarse lock. A cycle stops every live
//! service and waits for each exit, optionally runs the regeneration step,
//! starts every configured service and stamps the restart time. Failures in
//! any step are logged and never abort the cycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;

use super::Regenerator;
use crate::process::{ProcessSupervisor, StartReport};
use crate::state::{SharedState, Stamp};

/// Capacity of the cycle report broadcast channel.
pub const REPORT_CHANNEL_CAPACITY: usize = 32;

/// What asked for a restart cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    Startup,
    FileChange,
    Manual,
}

impl fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Startup => "startup",
            Self::FileChange => "file change",
            Self::Manual => "manual",
        })
    }
}

/// What happened to the regeneration step in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateOutcome {
    /// Not requested for this cycle.
    Skipped,
    /// Requested, but no regeneration step is configured.
    Disabled,
    Succeeded,
    Failed(String),
}

/// Summary of one completed restart cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Sequence number, starting at 1.
    pub id: u64,
    pub trigger: CycleTrigger,
    /// Services that had a live process and were stopped.
    pub stopped: usize,
    pub regenerate: RegenerateOutcome,
    pub start: StartReport,
    pub began: Instant,
    pub finished: Instant,
}

/// Runs restart cycles one at a time.
#[derive(Debug)]
pub struct RestartCoordinator {
    supervisor: ProcessSupervisor,
    regenerator: Option<Arc<dyn Regenerator>>,
    cycle_lock: Mutex<()>,
    shutting_down: AtomicBool,
    reports: broadcast::Sender<CycleReport>,
}

impl RestartCoordinator {
    #[must_use]
    pub fn new(supervisor: ProcessSupervisor, regenerator: Option<Arc<dyn Regenerator>>) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            supervisor,
            regenerator,
            cycle_lock: Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            reports,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SharedState {
        self.supervisor.state()
    }

    #[must_use]
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Receive a report after every completed cycle.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CycleReport> {
        self.reports.subscribe()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Run one full stop, regenerate, start cycle.
    ///
    /// Waits for any cycle in flight to finish first. A pending regeneration
    /// recorded by file changes is folded into `run_regenerate`. Returns
    /// `None` once shutdown has begun.
    pub async fn restart_all(
        &self,
        trigger: CycleTrigger,
        run_regenerate: bool,
    ) -> Option<CycleReport> {
        if self.is_shutting_down() {
            tracing::debug!(trigger = %trigger, "Shutdown in progress, restart ignored");
            return None;
        }

        let _cycle = self.cycle_lock.lock().await;
        if self.is_shutting_down() {
            tracing::debug!(trigger = %trigger, "Shutdown began while waiting, restart ignored");
            return None;
        }

        let began = Instant::now();
        let (id, pending) = {
            let mut state = self.state().lock();
            state.cycles += 1;
            (state.cycles, state.take_pending_regenerate())
        };
        let regenerate = run_regenerate || pending;

        tracing::info!(cycle = id, trigger = %trigger, regenerate, "Restart cycle started");

        let stopped = self.supervisor.stop_all().await;
        let outcome = if regenerate {
            self.regenerate().await
        } else {
            RegenerateOutcome::Skipped
        };
        let start = self.supervisor.start_all();

        self.state().lock().last_restart = Some(Stamp::now());

        let report = CycleReport {
            id,
            trigger,
            stopped,
            regenerate: outcome,
            start,
            began,
            finished: Instant::now(),
        };
        tracing::info!(
            cycle = id,
            started = report.start.started.len(),
            failed = report.start.failed.len(),
            "Restart cycle finished"
        );
        let _ = self.reports.send(report.clone());
        Some(report)
    }

    async fn regenerate(&self) -> RegenerateOutcome {
        let Some(regenerator) = &self.regenerator else {
            tracing::debug!("Regeneration disabled");
            return RegenerateOutcome::Disabled;
        };

        tracing::info!(command = %regenerator.describe(), "Regenerating sources");
        self.state().lock().regenerating = true;
        let result = regenerator.regenerate().await;

        let finished = Stamp::now();
        let mut state = self.state().lock();
        state.regenerating = false;
        state.regenerate_finished = Some(finished.at);
        match result {
            Ok(()) => {
                state.last_regenerate = Some(finished);
                state.regenerations += 1;
                RegenerateOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(error = %e, "Regeneration failed, starting with existing artifacts");
                state.regenerate_failures += 1;
                // Retry on the next cycle.
                state.pending_regenerate = true;
                RegenerateOutcome::Failed(e.to_string())
            }
        }
    }

    /// Refuse any cycle that has not yet acquired the lock.
    ///
    /// Returns `true` for the call that flipped the flag.
    pub fn begin_shutdown(&self) -> bool {
        let first = !self.shutting_down.swap(true, Ordering::SeqCst);
        self.state().lock().shutting_down = true;
        first
    }

    /// Terminal stop-only cycle. Waits its turn for the cycle lock.
    pub async fn stop_for_shutdown(&self) -> usize {
        self.begin_shutdown();
        let _cycle = self.cycle_lock.lock().await;
        let stopped = self.supervisor.stop_all().await;
        self.state().lock().clear_services();
        stopped
    }
}
