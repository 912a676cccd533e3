//! Orchestrator error types.

use crate::config::ConfigError;
use crate::watcher::WatcherError;

/// Fatal errors that prevent the orchestrator from running.
#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// File watching could not be set up.
    #[error("Failed to start file watcher: {0}")]
    Watcher(#[from] WatcherError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = OrchestratorError::from(ConfigError::NoServices);
        assert!(error.to_string().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_watcher_error_display() {
        let error = OrchestratorError::from(WatcherError::NothingToWatch);
        assert!(error.to_string().starts_with("Failed to start file watcher"));
    }
}
