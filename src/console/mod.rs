//! Interactive line console.
//!
//! Reads one command per line. End of input or a read error counts as a
//! request to shut down.

mod command;

pub use command::{parse_line, ConsoleCommand, ConsoleInput, HELP_TEXT};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::orchestrator::{CycleTrigger, RestartCoordinator, ShutdownController, ShutdownReason};

/// Prompt written before each read.
pub const PROMPT: &str = "dev> ";

/// Line console over any async reader and writer.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
    prompt: bool,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            prompt: true,
        }
    }

    /// Do not write a prompt before each read.
    #[must_use]
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    /// Consume the console and return its writer.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Serve commands until quit, end of input, or shutdown.
    pub async fn run(&mut self, coordinator: &RestartCoordinator, shutdown: &ShutdownController) {
        self.write(HELP_TEXT).await;
        let token = shutdown.token();
        let mut line = String::new();

        loop {
            if self.prompt {
                self.write(PROMPT).await;
            }
            line.clear();
            let read = tokio::select! {
                read = self.input.read_line(&mut line) => read,
                () = token.cancelled() => break,
            };
            match read {
                Ok(0) => {
                    tracing::debug!("Console input closed");
                    shutdown.request(ShutdownReason::InputClosed);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Console read failed");
                    shutdown.request(ShutdownReason::InputClosed);
                    break;
                }
            }

            match parse_line(&line) {
                ConsoleInput::Empty => {}
                ConsoleInput::Unknown(input) => {
                    tracing::warn!(input = %input, "Unknown command, type 'help' for a list");
                }
                ConsoleInput::Command(ConsoleCommand::Help) => self.write(HELP_TEXT).await,
                ConsoleInput::Command(ConsoleCommand::Status) => {
                    let text = coordinator.state().snapshot().render_text();
                    self.write(&text).await;
                }
                ConsoleInput::Command(ConsoleCommand::Restart) => {
                    if coordinator.restart_all(CycleTrigger::Manual, true).await.is_none() {
                        self.write("shutting down, restart ignored\n").await;
                    }
                }
                ConsoleInput::Command(ConsoleCommand::Quit) => {
                    shutdown.request(ShutdownReason::Quit);
                    break;
                }
            }
        }
    }

    async fn write(&mut self, text: &str) {
        let result = match self.output.write_all(text.as_bytes()).await {
            Ok(()) => self.output.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Console write failed");
        }
    }
}
