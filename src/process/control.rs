//! Process-tree termination capability.
//!
//! A service's start command usually forks the real server (`go run` builds
//! and then execs a child), so killing only the direct child would leave the
//! listener running. Where the platform supports it each service is placed in
//! its own process group and the whole group is killed.

use std::fmt::Debug;
use std::sync::Arc;

use tokio::process::Command;

use super::ProcessHandle;

/// Error type for tree termination.
#[derive(thiserror::Error, Debug)]
pub enum KillError {
    /// The process was not started in a group of its own.
    #[error("Process group termination not available")]
    Unsupported,
    /// Sending the signal failed.
    #[error("Failed to signal process group {group}: {reason}")]
    Signal { group: i32, reason: String },
}

/// How processes are started and torn down on this platform.
pub trait ProcessControl: Send + Sync + Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Adjust a command before spawn.
    fn configure(&self, command: &mut Command);

    /// Group id the spawned process leads, if any.
    fn group_of(&self, pid: u32) -> Option<i32>;

    /// Forcefully terminate the whole tree behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error when tree termination is unavailable or failed; the
    /// caller then falls back to killing the direct child.
    fn kill_tree(&self, handle: &ProcessHandle) -> Result<(), KillError>;
}

/// Kills the whole process group with `SIGKILL`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupControl;

#[cfg(unix)]
impl ProcessControl for GroupControl {
    fn name(&self) -> &'static str {
        "process-group"
    }

    fn configure(&self, command: &mut Command) {
        command.process_group(0);
    }

    fn group_of(&self, pid: u32) -> Option<i32> {
        // process_group(0) makes the child the leader of a group named after it.
        i32::try_from(pid).ok()
    }

    fn kill_tree(&self, handle: &ProcessHandle) -> Result<(), KillError> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let group = handle.group().ok_or(KillError::Unsupported)?;
        match killpg(Pid::from_raw(group), Signal::SIGKILL) {
            // Every member is already gone.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(KillError::Signal {
                group,
                reason: e.to_string(),
            }),
        }
    }
}

/// Kills only the direct child. Used where process groups are unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectControl;

impl ProcessControl for DirectControl {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn configure(&self, _command: &mut Command) {}

    fn group_of(&self, _pid: u32) -> Option<i32> {
        None
    }

    fn kill_tree(&self, _handle: &ProcessHandle) -> Result<(), KillError> {
        Err(KillError::Unsupported)
    }
}

/// The process control suited to the current platform.
#[must_use]
pub fn platform_control() -> Arc<dyn ProcessControl> {
    #[cfg(unix)]
    {
        Arc::new(GroupControl)
    }

    #[cfg(not(unix))]
    {
        Arc::new(DirectControl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::{mpsc, watch};

    fn handle(group: Option<i32>) -> ProcessHandle {
        let (kill_tx, _kill_rx) = mpsc::unbounded_channel();
        let (_exited_tx, exited_rx) = watch::channel(false);
        ProcessHandle::new(1, 1, group, kill_tx, exited_rx)
    }

    #[test]
    fn test_direct_control_never_kills_groups() {
        let control = DirectControl;
        assert_eq!(control.name(), "direct");
        assert!(control.group_of(100).is_none());
        assert!(matches!(
            control.kill_tree(&handle(Some(100))),
            Err(KillError::Unsupported)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_group_control_requires_group() {
        let control = GroupControl;
        assert_eq!(control.group_of(321), Some(321));
        assert!(matches!(
            control.kill_tree(&handle(None)),
            Err(KillError::Unsupported)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_control_uses_groups_on_unix() {
        assert_eq!(platform_control().name(), "process-group");
    }

    #[test]
    fn test_kill_error_display() {
        let err = KillError::Signal {
            group: 12,
            reason: "EPERM".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to signal process group 12: EPERM");
    }
}
