//! Process supervision error types.

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The shell or program was not found.
    #[error("Program not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("Permission denied")]
    PermissionDenied,
    /// The child exited before its pid could be read.
    #[error("Process exited before it could be tracked")]
    NoPid,
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Error type for supervisor operations on a single service.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// No service with this name is configured.
    #[error("Unknown service: {0}")]
    UnknownService(String),
    /// The service still has a live process.
    #[error("Service {0} is already running")]
    AlreadyRunning(String),
    /// The start command could not be spawned.
    #[error("Failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: SpawnError,
    },
}
