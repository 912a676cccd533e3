//! Top-level run loop wiring every component together.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    wait_for_shutdown_signal, CommandRegenerator, CycleTrigger, Debouncer, OrchestratorError,
    Regenerator, RestartCoordinator, ShutdownController, ShutdownReason,
};
use crate::config::DevConfig;
use crate::console::Console;
use crate::dashboard::StatusServer;
use crate::display;
use crate::process::{platform_control, ProcessSupervisor};
use crate::state::SharedState;
use crate::watcher::{ChangeClassifier, WatchMessage, WatchSource};

/// The dev orchestrator.
#[derive(Debug)]
pub struct Orchestrator {
    config: DevConfig,
}

impl Orchestrator {
    /// Create an orchestrator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: DevConfig) -> Result<Self, OrchestratorError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &DevConfig {
        &self.config
    }

    /// Run against the process's stdin and stdout until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be set up.
    pub async fn run(self) -> Result<ShutdownReason, OrchestratorError> {
        self.run_with_console(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Run with the console reading from `input` and writing to `output`.
    ///
    /// Startup order: signal handling, file watching, the initial cycle with
    /// regeneration, then the status endpoint, change pump, debounce timer and
    /// console. Changes seen during the initial cycle are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be set up.
    pub async fn run_with_console<R, W>(
        self,
        input: R,
        output: W,
    ) -> Result<ShutdownReason, OrchestratorError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let config = self.config;
        let shutdown = Arc::new(ShutdownController::new());
        spawn_signal_listener(shutdown.clone());

        let classifier = ChangeClassifier::from_config(&config.watch)?;
        let (source, mut changes) = WatchSource::new(&config.watch.roots, &config.watch.ignored_dirs)?;

        let specs = config.service_specs();
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let state = SharedState::from_specs(&specs);
        let supervisor = ProcessSupervisor::new(state.clone(), platform_control());
        let regenerator = config.regenerate.enabled.then(|| {
            Arc::new(CommandRegenerator::new(config.regenerate.command.clone())) as Arc<dyn Regenerator>
        });
        let coordinator = Arc::new(RestartCoordinator::new(supervisor, regenerator));
        tracing::debug!(control = coordinator.supervisor().control_name(), "Process control selected");

        let printer = spawn_report_printer(coordinator.subscribe(), shutdown.token());
        display::print_banner(&names, &config.status.addr);

        coordinator.restart_all(CycleTrigger::Startup, true).await;
        let discarded = drain_pending(&mut changes);
        if discarded > 0 {
            tracing::debug!(discarded, "Discarded changes seen during startup");
        }

        let status = StatusServer::new(config.status.clone(), state.clone());
        let server = tokio::spawn(status.run(shutdown.token()));

        let debouncer = Arc::new(Debouncer::new(config.watch.debounce(), state.clone()));
        let timer = {
            let debouncer = debouncer.clone();
            let coordinator = coordinator.clone();
            let token = shutdown.token();
            tokio::spawn(async move { debouncer.run(&coordinator, token).await })
        };
        let pump = tokio::spawn(pump_changes(
            source,
            changes,
            classifier,
            debouncer,
            state,
            shutdown.token(),
        ));

        {
            let coordinator = coordinator.clone();
            let shutdown = shutdown.clone();
            // Not joined: a blocked stdin read never completes.
            tokio::spawn(async move {
                Console::new(input, output).run(&coordinator, &shutdown).await;
            });
        }

        let reason = shutdown.requested().await;
        display::print_shutdown(reason);
        shutdown.execute(&coordinator).await;

        for task in [timer, pump, printer] {
            let _ = task.await;
        }
        if let Ok(Err(e)) = server.await {
            tracing::warn!(error = %e, "Status endpoint stopped with an error");
        }

        Ok(reason)
    }
}

fn spawn_signal_listener(shutdown: Arc<ShutdownController>) {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                shutdown.request(ShutdownReason::Signal);
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });
}

fn spawn_report_printer(
    mut reports: broadcast::Receiver<super::CycleReport>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = reports.recv() => match received {
                    Ok(report) => display::print_cycle(&report),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Cycle reports skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                () = cancel.cancelled() => break,
            }
        }
    })
}

/// Drop everything already queued. Returns how many messages were dropped.
fn drain_pending(changes: &mut mpsc::UnboundedReceiver<WatchMessage>) -> usize {
    let mut dropped = 0;
    while changes.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

/// Classify every change and feed the relevant ones to the debouncer.
async fn pump_changes(
    mut source: WatchSource,
    mut changes: mpsc::UnboundedReceiver<WatchMessage>,
    classifier: ChangeClassifier,
    debouncer: Arc<Debouncer>,
    state: SharedState,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            message = changes.recv() => message,
            () = cancel.cancelled() => break,
        };
        match message {
            Some(WatchMessage::Change(event)) => {
                let added = source.track_directory_change(&event);
                if added > 0 {
                    tracing::debug!(path = %event.path.display(), added, "Watching new directories");
                }

                let marks = state.lock().regenerate_marks();
                let classification = classifier.classify_with(&event, marks);
                if debouncer.record(&event, classification) {
                    tracing::info!(
                        change = %event.describe(),
                        regenerate = classification.needs_regenerate,
                        "Change detected"
                    );
                } else {
                    tracing::trace!(change = %event.describe(), "Change ignored");
                }
            }
            Some(WatchMessage::Error(e)) => {
                tracing::warn!(error = %e, "File watcher error");
            }
            None => break,
        }
    }
    tracing::debug!("Change pump stopped");
}
