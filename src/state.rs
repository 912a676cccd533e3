//! Shared supervision state.
//!
//! All reads and writes go through [`SharedState::lock`]. Critical sections
//! only touch fields; no process I/O or await happens while the guard is held.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::ServiceSpec;
use crate::process::{ManagedService, ServiceState};
use crate::watcher::RegenerateMarks;

/// Display format for wall-clock timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A moment recorded both monotonically and on the wall clock.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub at: Instant,
    pub wall: DateTime<Local>,
}

impl Stamp {
    #[must_use]
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Local::now(),
        }
    }
}

/// State shared by every orchestrator component.
#[derive(Debug, Default)]
pub struct SupervisionState {
    /// Services in configuration order.
    services: Vec<ManagedService>,
    pub last_restart: Option<Stamp>,
    pub last_regenerate: Option<Stamp>,
    /// The regeneration command is running.
    pub regenerating: bool,
    /// When the regeneration command last finished, successful or not.
    pub regenerate_finished: Option<Instant>,
    pub last_change: Option<String>,
    pub pending_regenerate: bool,
    pub cycles: u64,
    pub regenerations: u64,
    pub regenerate_failures: u64,
    pub shutting_down: bool,
}

impl SupervisionState {
    #[must_use]
    pub fn new(specs: &[ServiceSpec]) -> Self {
        Self {
            services: specs.iter().map(ManagedService::new).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ManagedService> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut ManagedService> {
        self.services.iter_mut().find(|s| s.name == name)
    }

    pub fn services(&self) -> impl Iterator<Item = &ManagedService> {
        self.services.iter()
    }

    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Mark every service stopped and drop its handle.
    pub fn clear_services(&mut self) {
        for svc in &mut self.services {
            svc.mark_stopped();
        }
    }

    /// Read and clear the pending regeneration flag in one step.
    pub fn take_pending_regenerate(&mut self) -> bool {
        std::mem::take(&mut self.pending_regenerate)
    }

    /// Record a relevant change.
    pub fn note_change(&mut self, description: String, needs_regenerate: bool) {
        self.pending_regenerate |= needs_regenerate;
        self.last_change = Some(description);
    }

    /// Regeneration progress as seen by the change classifier.
    #[must_use]
    pub fn regenerate_marks(&self) -> RegenerateMarks {
        RegenerateMarks {
            in_progress: self.regenerating,
            last_finished: self.regenerate_finished,
        }
    }

    /// Copy everything the status views need.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            services: self
                .services
                .iter()
                .map(|s| ServiceStatus {
                    name: s.name.clone(),
                    state: s.state,
                    pid: s.pid,
                    starts: s.starts,
                    last_exit: s.last_exit.clone(),
                })
                .collect(),
            last_restart: self.last_restart.map(|s| s.wall),
            last_regenerate: self.last_regenerate.map(|s| s.wall),
            regenerating: self.regenerating,
            last_change: self.last_change.clone(),
            pending_regenerate: self.pending_regenerate,
            cycles: self.cycles,
            regenerations: self.regenerations,
            regenerate_failures: self.regenerate_failures,
            shutting_down: self.shutting_down,
        }
    }
}

/// Cloneable handle to the supervision state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SupervisionState>>,
}

impl SharedState {
    #[must_use]
    pub fn new(state: SupervisionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    #[must_use]
    pub fn from_specs(specs: &[ServiceSpec]) -> Self {
        Self::new(SupervisionState::new(specs))
    }

    /// Lock the state. A panic in another holder does not make it unusable.
    pub fn lock(&self) -> MutexGuard<'_, SupervisionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a consistent snapshot under a single lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot()
    }
}

/// Per-service row of a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub state: ServiceState,
    pub pid: Option<u32>,
    pub starts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<String>,
}

/// Read-only view of the supervision state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub services: Vec<ServiceStatus>,
    pub last_restart: Option<DateTime<Local>>,
    pub last_regenerate: Option<DateTime<Local>>,
    #[serde(default)]
    pub regenerating: bool,
    pub last_change: Option<String>,
    pub pending_regenerate: bool,
    pub cycles: u64,
    pub regenerations: u64,
    pub regenerate_failures: u64,
    pub shutting_down: bool,
}

impl StatusSnapshot {
    /// Render the snapshot as a plain-text table.
    #[must_use]
    pub fn render_text(&self) -> String {
        let width = self
            .services
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0)
            .max("SERVICE".len());

        let mut out = String::new();
        let _ = writeln!(out, "{:<width$}  {:<8}  {:>8}  STARTS", "SERVICE", "STATE", "PID");
        for svc in &self.services {
            let _ = writeln!(
                out,
                "{:<width$}  {:<8}  {:>8}  {}",
                svc.name,
                svc.state.as_str(),
                format_pid(svc.pid),
                svc.starts
            );
        }
        let _ = writeln!(out, "last restart:    {}", format_time(self.last_restart));
        let _ = writeln!(out, "last regenerate: {}", format_time(self.last_regenerate));
        let _ = writeln!(
            out,
            "last change:     {}",
            self.last_change.as_deref().unwrap_or("-")
        );
        let _ = writeln!(
            out,
            "cycles: {}  regenerations: {} ({} failed)",
            self.cycles, self.regenerations, self.regenerate_failures
        );
        out
    }
}

/// Format an optional process id, `-` when absent.
#[must_use]
pub fn format_pid(pid: Option<u32>) -> String {
    pid.map_or_else(|| "-".to_string(), |p| p.to_string())
}

/// Format an optional timestamp, `-` when absent.
#[must_use]
pub fn format_time(time: Option<DateTime<Local>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format(TIME_FORMAT).to_string())
}
