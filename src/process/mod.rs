//! Process supervision: starting services and tearing down process trees.

mod control;
mod error;
mod service;
mod supervisor;

pub use control::{platform_control, DirectControl, KillError, ProcessControl};
#[cfg(unix)]
pub use control::GroupControl;
pub use error::{SpawnError, SupervisorError};
pub use service::{ManagedService, ProcessHandle, ServiceState};
pub(crate) use supervisor::shell_command;
pub use supervisor::{ProcessSupervisor, StartReport};
