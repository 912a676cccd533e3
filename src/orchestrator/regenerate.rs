//! The regeneration step that rebuilds generated sources.

use std::fmt::Debug;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;

use crate::process::shell_command;

/// Error type for the regeneration step.
#[derive(thiserror::Error, Debug)]
pub enum RegenerateError {
    /// The command could not be launched.
    #[error("Failed to launch regeneration command: {0}")]
    Launch(#[from] std::io::Error),
    /// The command ran and reported failure.
    #[error("Regeneration command failed with {0}")]
    Status(ExitStatus),
    /// Any other failure.
    #[error("Regeneration failed: {0}")]
    Failed(String),
}

/// Something that rebuilds derived artifacts.
#[async_trait]
pub trait Regenerator: Send + Sync + Debug {
    /// Short description for logs.
    fn describe(&self) -> String;

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifacts could not be regenerated.
    async fn regenerate(&self) -> Result<(), RegenerateError>;
}

/// Runs a shell command, forwarding its output to ours.
#[derive(Debug, Clone)]
pub struct CommandRegenerator {
    command: String,
}

impl CommandRegenerator {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Regenerator for CommandRegenerator {
    fn describe(&self) -> String {
        self.command.clone()
    }

    async fn regenerate(&self) -> Result<(), RegenerateError> {
        let status = shell_command(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(RegenerateError::Status(status))
        }
    }
}
