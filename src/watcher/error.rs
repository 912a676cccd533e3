//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur during file watching.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// A configured watch root could not be read.
    #[error("Cannot watch root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the configured roots could be watched.
    #[error("No watchable directories found")]
    NothingToWatch,

    /// A generated-artifact pattern failed to compile.
    #[error("Invalid generated-artifact pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
