//! Notify-backed source of change events.
//!
//! Watches every directory under the configured roots non-recursively (the
//! excluded subtrees are pruned up front) and bridges notify's callback
//! thread into a tokio channel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatcherError;
use super::event::{ChangeEvent, ChangeKind};
use super::tree::{collect_watch_dirs, is_excluded_path};

/// Messages delivered by the watch source.
#[derive(Debug)]
pub enum WatchMessage {
    /// A change on one path.
    Change(ChangeEvent),
    /// A per-event watcher error. Never fatal.
    Error(WatcherError),
}

/// Live set of watched directories.
pub struct WatchSource {
    watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
    ignored: Vec<String>,
    watched: HashSet<PathBuf>,
}

impl WatchSource {
    /// Start watching the given roots.
    ///
    /// Returns the source, which must be kept alive for events to flow, and
    /// the receiving end of the event channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created, or if no
    /// directory at all could be watched.
    pub fn new(
        roots: &[PathBuf],
        ignored: &[String],
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchMessage>), WatcherError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let received = Instant::now();
            match result {
                Ok(event) => {
                    for change in ChangeEvent::from_notify(&event, received) {
                        let _ = event_tx.send(WatchMessage::Change(change));
                    }
                }
                Err(e) => {
                    let _ = event_tx.send(WatchMessage::Error(WatcherError::Notify(e)));
                }
            }
        })?;

        let mut source = Self {
            watcher,
            roots: roots.to_vec(),
            ignored: ignored.to_vec(),
            watched: HashSet::new(),
        };

        for root in roots {
            match collect_watch_dirs(root, ignored) {
                Ok(dirs) => {
                    for dir in dirs {
                        source.watch_dir(dir)?;
                    }
                }
                Err(source_err) => {
                    let err = WatcherError::Root {
                        path: root.clone(),
                        source: source_err,
                    };
                    tracing::warn!(error = %err, "Skipping watch root");
                }
            }
        }

        if source.watched.is_empty() {
            return Err(WatcherError::NothingToWatch);
        }

        tracing::info!(
            roots = ?source.roots,
            directories = source.watched.len(),
            "Watching source directories"
        );

        Ok((source, event_rx))
    }

    fn watch_dir(&mut self, dir: PathBuf) -> Result<(), WatcherError> {
        if self.watched.contains(&dir) {
            return Ok(());
        }
        self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::trace!(path = %dir.display(), "Watching directory");
        self.watched.insert(dir);
        Ok(())
    }

    /// Keep the watch set in step with directories created or removed at
    /// runtime. Returns the number of newly watched directories.
    pub fn track_directory_change(&mut self, event: &ChangeEvent) -> usize {
        match event.kind {
            ChangeKind::Created | ChangeKind::Renamed if event.path.is_dir() => {
                self.watch_new_tree(&event.path)
            }
            ChangeKind::Removed | ChangeKind::Renamed => {
                let before = self.watched.len();
                self.watched.retain(|dir| !dir.starts_with(&event.path));
                if self.watched.len() != before {
                    tracing::debug!(path = %event.path.display(), "Directory no longer watched");
                }
                0
            }
            _ => 0,
        }
    }

    fn watch_new_tree(&mut self, dir: &Path) -> usize {
        let Some(root) = self.roots.iter().find(|r| dir.starts_with(r)) else {
            return 0;
        };
        let relative = dir.strip_prefix(root).unwrap_or(dir);
        if is_excluded_path(relative, &self.ignored) {
            return 0;
        }

        let dirs = match collect_watch_dirs(dir, &self.ignored) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "New directory vanished");
                return 0;
            }
        };

        let mut added = 0;
        for new_dir in dirs {
            if self.watched.contains(&new_dir) {
                continue;
            }
            match self.watch_dir(new_dir.clone()) {
                Ok(()) => added += 1,
                Err(e) => {
                    tracing::warn!(path = %new_dir.display(), error = %e, "Cannot watch directory");
                }
            }
        }
        if added > 0 {
            tracing::debug!(path = %dir.display(), added, "Watching new directories");
        }
        added
    }

    /// Number of directories currently watched.
    #[must_use]
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Whether a directory is in the watch set.
    #[must_use]
    pub fn is_watching(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }
}

impl std::fmt::Debug for WatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSource")
            .field("roots", &self.roots)
            .field("watched", &self.watched.len())
            .finish_non_exhaustive()
    }
}
