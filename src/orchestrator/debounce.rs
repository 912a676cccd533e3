//! Debounce coalescer.
//!
//! Relevant changes land in a single pending slot holding the deadline of the
//! next cycle. Every change pushes the deadline out to `delay` after itself, so
//! a burst collapses into one cycle timed from its last event. One waiting
//! task sleeps until the deadline, claims the slot and runs the cycle; if a
//! cycle is already in flight it queues on the coordinator's lock.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use super::{CycleTrigger, RestartCoordinator};
use crate::state::SharedState;
use crate::watcher::{ChangeEvent, Classification};

/// Merges bursts of relevant changes into one scheduled restart.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    state: SharedState,
    deadline: watch::Sender<Option<Instant>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration, state: SharedState) -> Self {
        let (deadline, _) = watch::channel(None);
        Self {
            delay,
            state,
            deadline,
        }
    }

    /// Record a classified change. Irrelevant changes are ignored.
    ///
    /// Returns whether the change (re)armed the timer.
    pub fn record(&self, event: &ChangeEvent, classification: Classification) -> bool {
        if !classification.relevant {
            return false;
        }
        self.state
            .lock()
            .note_change(event.describe(), classification.needs_regenerate);
        self.arm();
        true
    }

    /// Schedule a cycle `delay` from now, replacing any earlier deadline.
    pub fn arm(&self) {
        self.deadline.send_replace(Some(Instant::now() + self.delay));
    }

    /// Deadline of the scheduled cycle, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    /// Clear the slot only if it still holds `at`.
    fn claim(&self, at: Instant) -> bool {
        self.deadline.send_if_modified(|slot| {
            if *slot == Some(at) {
                *slot = None;
                true
            } else {
                false
            }
        })
    }

    /// Wait for deadlines and run cycles until cancelled.
    pub async fn run(&self, coordinator: &RestartCoordinator, cancel: CancellationToken) {
        let mut rx = self.deadline.subscribe();
        loop {
            let scheduled = *rx.borrow_and_update();
            match scheduled {
                None => {
                    tokio::select! {
                        changed = rx.changed() => if changed.is_err() { break },
                        () = cancel.cancelled() => break,
                    }
                }
                Some(at) => {
                    tokio::select! {
                        () = sleep_until(at) => {
                            if self.claim(at) {
                                coordinator.restart_all(CycleTrigger::FileChange, false).await;
                            }
                        }
                        changed = rx.changed() => if changed.is_err() { break },
                        () = cancel.cancelled() => break,
                    }
                }
            }
        }
        tracing::debug!("Debounce task stopped");
    }
}
