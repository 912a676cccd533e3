//! Process supervisor.
//!
//! Starts services in their own process group, hands each child to a
//! dedicated exit observer, and tears whole process trees down on stop.
//! The observer is the only writer of the `Exited` state, so a manual stop and
//! a natural exit can never race on the service record.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use super::{KillError, ProcessControl, ProcessHandle, SpawnError, SupervisorError};
use crate::state::SharedState;

/// Result of starting every configured service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Services that were started, in order.
    pub started: Vec<String>,
    /// Services that failed to start, with the reason.
    pub failed: Vec<(String, String)>,
}

impl StartReport {
    #[must_use]
    pub fn all_started(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns every managed process.
#[derive(Debug)]
pub struct ProcessSupervisor {
    state: SharedState,
    control: Arc<dyn ProcessControl>,
    next_run: AtomicU64,
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(state: SharedState, control: Arc<dyn ProcessControl>) -> Self {
        Self {
            state,
            control,
            next_run: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Name of the process control in use.
    #[must_use]
    pub fn control_name(&self) -> &'static str {
        self.control.name()
    }

    /// Start one service and attach its exit observer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unknown, still has a live process,
    /// or its command cannot be spawned. A spawn failure leaves the service
    /// `Stopped` with the reason recorded as its last exit.
    pub fn start(&self, name: &str) -> Result<u32, SupervisorError> {
        let command = {
            let guard = self.state.lock();
            let svc = guard
                .service(name)
                .ok_or_else(|| SupervisorError::UnknownService(name.to_string()))?;
            if svc.handle.is_some() {
                return Err(SupervisorError::AlreadyRunning(name.to_string()));
            }
            svc.command.clone()
        };

        tracing::info!(service = name, command = %command, "Starting service");

        let mut cmd = shell_command(&command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        self.control.configure(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Err(self.start_failed(name, SpawnError::from_io(e))),
        };
        let Some(pid) = child.id() else {
            let _ = child.start_kill();
            return Err(self.start_failed(name, SpawnError::NoPid));
        };

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed) + 1;
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        let handle = ProcessHandle::new(run_id, pid, self.control.group_of(pid), kill_tx, exited_rx);

        if let Some(svc) = self.state.lock().service_mut(name) {
            svc.attach(handle);
        }

        tokio::spawn(observe_exit(
            child,
            name.to_string(),
            run_id,
            kill_rx,
            exited_tx,
            self.state.clone(),
        ));

        if self
            .state
            .lock()
            .service_mut(name)
            .is_some_and(|svc| svc.mark_running(run_id))
        {
            tracing::info!(service = name, pid, "Service running");
        }

        Ok(pid)
    }

    fn start_failed(&self, name: &str, source: SpawnError) -> SupervisorError {
        if let Some(svc) = self.state.lock().service_mut(name) {
            svc.record_start_failure(format!("start failed: {source}"));
        }
        SupervisorError::Spawn {
            name: name.to_string(),
            source,
        }
    }

    /// Kill the service's whole process tree and wait for its observer.
    ///
    /// Returns `Ok(false)` without doing anything if the service has no live
    /// process.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::UnknownService` for unconfigured names.
    pub async fn stop_tree(&self, name: &str) -> Result<bool, SupervisorError> {
        let handle = {
            let guard = self.state.lock();
            let svc = guard
                .service(name)
                .ok_or_else(|| SupervisorError::UnknownService(name.to_string()))?;
            match &svc.handle {
                Some(handle) => handle.clone(),
                None => return Ok(false),
            }
        };

        tracing::info!(service = name, pid = handle.pid(), "Stopping service");

        match self.control.kill_tree(&handle) {
            Ok(()) => {}
            Err(KillError::Unsupported) => handle.kill_direct(),
            Err(e) => {
                tracing::warn!(service = name, error = %e, "Group kill failed, killing process only");
                handle.kill_direct();
            }
        }

        handle.wait_exit().await;

        if let Some(svc) = self.state.lock().service_mut(name) {
            // A newer run can only appear if someone bypassed the cycle lock.
            if svc.current_run().is_none() || svc.current_run() == Some(handle.run_id()) {
                svc.mark_stopped();
            }
        }

        tracing::debug!(service = name, "Service stopped");
        Ok(true)
    }

    /// Start every configured service. One failure does not stop the rest.
    pub fn start_all(&self) -> StartReport {
        let mut report = StartReport::default();
        let names = self.state.lock().service_names();
        for name in names {
            match self.start(&name) {
                Ok(_) => report.started.push(name),
                Err(e) => {
                    tracing::error!(service = %name, error = %e, "Service failed to start");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    /// Stop every live service. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let mut stopped = 0;
        let names = self.state.lock().service_names();
        for name in names {
            match self.stop_tree(&name).await {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(service = %name, error = %e, "Failed to stop service"),
            }
        }
        stopped
    }
}

/// Build a command that runs `command` through the platform shell.
pub(crate) fn shell_command(command: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }

    #[cfg(not(unix))]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
}

/// Sole owner of a child process: reaps it and records the exit.
async fn observe_exit(
    mut child: Child,
    name: String,
    run_id: u64,
    mut kill_rx: mpsc::UnboundedReceiver<()>,
    exited_tx: watch::Sender<bool>,
    state: SharedState,
) {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(()) = kill_rx.recv() => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(service = %name, error = %e, "Kill request after exit");
                }
            }
        }
    };

    let description = describe_exit(&status);
    match &status {
        Ok(s) if s.success() => tracing::info!(service = %name, "Service exited normally"),
        Ok(_) => tracing::info!(service = %name, status = %description, "Service exited"),
        Err(e) => tracing::error!(service = %name, error = %e, "Failed to wait for service"),
    }

    if let Some(svc) = state.lock().service_mut(&name) {
        svc.record_exit(run_id, description);
    }
    exited_tx.send_replace(true);
}

fn describe_exit(status: &std::io::Result<ExitStatus>) -> String {
    match status {
        Ok(s) => s.to_string(),
        Err(e) => format!("wait failed: {e}"),
    }
}
