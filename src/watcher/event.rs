//! Filesystem change events as seen by the orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use notify::event::{EventKind, ModifyKind};

/// Kind of change reported for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    /// Access, metadata-only and unknown notifications.
    Other,
}

impl ChangeKind {
    /// Map a raw notify event kind onto the orchestrator's kinds.
    #[must_use]
    pub fn from_notify(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Renamed,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::Other,
            EventKind::Modify(_) => Self::Modified,
            EventKind::Remove(_) => Self::Removed,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Other,
        }
    }

    /// Whether this kind can trigger a restart at all.
    #[must_use]
    pub fn is_tracked(self) -> bool {
        !matches!(self, Self::Other)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "CREATE",
            Self::Modified => "WRITE",
            Self::Removed => "REMOVE",
            Self::Renamed => "RENAME",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One filesystem notification for a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// When the orchestrator received the notification.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Create an event stamped with the current instant.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self::at(path, kind, Instant::now())
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>, kind: ChangeKind, timestamp: Instant) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp,
        }
    }

    /// Split a notify event into one change event per affected path.
    #[must_use]
    pub fn from_notify(event: &notify::Event, timestamp: Instant) -> Vec<Self> {
        let kind = ChangeKind::from_notify(&event.kind);
        event
            .paths
            .iter()
            .map(|path| Self::at(path.clone(), kind, timestamp))
            .collect()
    }

    /// Human-readable description kept as the last change in the status.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.kind)
    }
}
