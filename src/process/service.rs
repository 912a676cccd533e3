//! Managed service model.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::config::ServiceSpec;

/// Lifecycle state of a managed service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    Stopped,
    Starting,
    Running,
    Exited,
}

impl ServiceState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Exited => "exited",
        }
    }

    /// Whether a live process handle belongs to this state.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one running process, shared between the supervisor and the
/// process's exit observer.
///
/// The observer task owns the child itself; the handle only carries what is
/// needed to terminate it and to wait for the observer's confirmation.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    run_id: u64,
    pid: u32,
    group: Option<i32>,
    kill_tx: mpsc::UnboundedSender<()>,
    exited: watch::Receiver<bool>,
}

impl ProcessHandle {
    pub(crate) fn new(
        run_id: u64,
        pid: u32,
        group: Option<i32>,
        kill_tx: mpsc::UnboundedSender<()>,
        exited: watch::Receiver<bool>,
    ) -> Self {
        Self {
            run_id,
            pid,
            group,
            kill_tx,
            exited,
        }
    }

    /// Identifier of the start that produced this handle.
    #[must_use]
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Process group id, when the process leads its own group.
    #[must_use]
    pub fn group(&self) -> Option<i32> {
        self.group
    }

    /// Ask the observer to kill the direct child only.
    pub fn kill_direct(&self) {
        let _ = self.kill_tx.send(());
    }

    /// Whether the observer has already recorded the exit.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Wait until the observer has reaped the process.
    pub async fn wait_exit(&self) {
        let mut rx = self.exited.clone();
        // A dropped sender means the observer is gone; nothing left to wait for.
        let _ = rx.wait_for(|exited| *exited).await;
    }
}

/// One supervised service.
#[derive(Debug, Clone)]
pub struct ManagedService {
    pub name: String,
    pub command: String,
    pub state: ServiceState,
    pub handle: Option<ProcessHandle>,
    pub pid: Option<u32>,
    /// Description of the most recent exit or start failure.
    pub last_exit: Option<String>,
    /// How many times the service has been started.
    pub starts: u64,
}

impl ManagedService {
    #[must_use]
    pub fn new(spec: &ServiceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            command: spec.command.clone(),
            state: ServiceState::Stopped,
            handle: None,
            pid: None,
            last_exit: None,
            starts: 0,
        }
    }

    /// Attach a freshly spawned process. The service becomes `Starting`.
    pub(crate) fn attach(&mut self, handle: ProcessHandle) {
        self.pid = Some(handle.pid());
        self.handle = Some(handle);
        self.state = ServiceState::Starting;
        self.starts = self.starts.saturating_add(1);
    }

    /// Promote `Starting` to `Running` if the run is still current.
    pub(crate) fn mark_running(&mut self, run_id: u64) -> bool {
        if self.current_run() == Some(run_id) && self.state == ServiceState::Starting {
            self.state = ServiceState::Running;
            return true;
        }
        false
    }

    /// Record a natural or forced exit. Only the exit observer calls this.
    pub(crate) fn record_exit(&mut self, run_id: u64, description: String) -> bool {
        if self.current_run() != Some(run_id) {
            return false;
        }
        self.state = ServiceState::Exited;
        self.handle = None;
        self.pid = None;
        self.last_exit = Some(description);
        true
    }

    /// Clear the service after a stop.
    pub(crate) fn mark_stopped(&mut self) {
        self.state = ServiceState::Stopped;
        self.handle = None;
        self.pid = None;
    }

    pub(crate) fn record_start_failure(&mut self, description: String) {
        self.mark_stopped();
        self.last_exit = Some(description);
    }

    /// Run id of the attached handle, if any.
    #[must_use]
    pub fn current_run(&self) -> Option<u64> {
        self.handle.as_ref().map(ProcessHandle::run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ManagedService {
        ManagedService::new(&ServiceSpec {
            name: "api".to_string(),
            command: "sleep 30".to_string(),
        })
    }

    fn handle(run_id: u64) -> (ProcessHandle, watch::Sender<bool>) {
        let (kill_tx, _kill_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        (ProcessHandle::new(run_id, 4242, Some(4242), kill_tx, exited_rx), exited_tx)
    }

    #[test]
    fn test_new_service_is_stopped() {
        let svc = service();
        assert_eq!(svc.state, ServiceState::Stopped);
        assert!(svc.handle.is_none());
        assert!(svc.pid.is_none());
        assert_eq!(svc.starts, 0);
    }

    #[test]
    fn test_lifecycle_keeps_handle_in_step_with_state() {
        let mut svc = service();
        let (h, _tx) = handle(1);

        svc.attach(h);
        assert_eq!(svc.state, ServiceState::Starting);
        assert_eq!(svc.pid, Some(4242));
        assert!(svc.mark_running(1));
        assert_eq!(svc.state, ServiceState::Running);
        assert!(svc.state.is_live() && svc.handle.is_some());

        assert!(svc.record_exit(1, "exit status: 1".to_string()));
        assert_eq!(svc.state, ServiceState::Exited);
        assert!(svc.handle.is_none());
        assert_eq!(svc.last_exit.as_deref(), Some("exit status: 1"));
    }

    #[test]
    fn test_stale_run_is_ignored() {
        let mut svc = service();
        let (h, _tx) = handle(2);
        svc.attach(h);

        assert!(!svc.record_exit(1, "old".to_string()));
        assert!(!svc.mark_running(1));
        assert_eq!(svc.state, ServiceState::Starting);
    }

    #[test]
    fn test_start_failure_leaves_service_stopped() {
        let mut svc = service();
        svc.record_start_failure("spawn failed".to_string());
        assert_eq!(svc.state, ServiceState::Stopped);
        assert_eq!(svc.last_exit.as_deref(), Some("spawn failed"));
    }

    #[tokio::test]
    async fn test_wait_exit_returns_after_signal() {
        let (h, tx) = handle(1);
        assert!(!h.has_exited());
        tx.send_replace(true);
        h.wait_exit().await;
        assert!(h.has_exited());
    }

    #[tokio::test]
    async fn test_wait_exit_returns_when_observer_dropped() {
        let (h, tx) = handle(1);
        drop(tx);
        h.wait_exit().await;
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ServiceState::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(ServiceState::Exited.to_string(), "exited");
    }
}
