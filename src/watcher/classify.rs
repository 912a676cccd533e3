//! Change classification.
//!
//! Decides for each raw change whether it should schedule a restart and
//! whether that restart must run the regeneration step first. The classifier
//! holds no shared state; callers pass in the time of the last regeneration
//! and update the supervision state themselves.

use std::path::Path;
use std::time::{Duration, Instant};

use regex::Regex;

use super::{ChangeEvent, WatcherError};
use crate::config::WatchConfig;

/// Outcome of classifying one change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub relevant: bool,
    pub needs_regenerate: bool,
}

impl Classification {
    /// An event that must not schedule anything.
    pub const IRRELEVANT: Self = Self {
        relevant: false,
        needs_regenerate: false,
    };
}

/// What the classifier knows about the regeneration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegenerateMarks {
    /// The step is running right now.
    pub in_progress: bool,
    /// When the last run finished, successful or not.
    pub last_finished: Option<Instant>,
}

impl RegenerateMarks {
    /// Marks for a step that is idle and last finished at `at`.
    #[must_use]
    pub fn finished_at(at: Option<Instant>) -> Self {
        Self {
            in_progress: false,
            last_finished: at,
        }
    }
}

/// Naming conventions used to classify changes.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    extension: String,
    interface_dirs: Vec<String>,
    interface_suffixes: Vec<String>,
    generated: Vec<Regex>,
    suppression: Duration,
}

impl ChangeClassifier {
    /// Build a classifier from the watch configuration.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::InvalidPattern` if a generated-artifact pattern
    /// does not compile.
    pub fn from_config(config: &WatchConfig) -> Result<Self, WatcherError> {
        let generated = config
            .generated_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extension: config.source_extension.trim_start_matches('.').to_string(),
            interface_dirs: config.interface_dirs.clone(),
            interface_suffixes: config.interface_suffixes.clone(),
            generated,
            suppression: config.suppression(),
        })
    }

    /// Classify a change against an idle regeneration step.
    ///
    /// `last_regenerate` is the completion time of the most recent
    /// regeneration, if any.
    #[must_use]
    pub fn classify(&self, event: &ChangeEvent, last_regenerate: Option<Instant>) -> Classification {
        self.classify_with(event, RegenerateMarks::finished_at(last_regenerate))
    }

    /// Classify a change.
    ///
    /// Generated artifacts are suppressed while the regeneration step runs
    /// and for the suppression window after it finished.
    #[must_use]
    pub fn classify_with(&self, event: &ChangeEvent, marks: RegenerateMarks) -> Classification {
        if !event.kind.is_tracked() || !self.is_tracked_source(&event.path) {
            return Classification::IRRELEVANT;
        }

        let path = normalized(&event.path);

        if self.is_generated(&path)
            && (marks.in_progress || self.within_suppression(event.timestamp, marks.last_finished))
        {
            tracing::trace!(path = %path, "Ignoring freshly generated artifact");
            return Classification::IRRELEVANT;
        }

        Classification {
            relevant: true,
            needs_regenerate: self.is_interface_source(&path),
        }
    }

    fn is_tracked_source(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }

    /// Whether the path follows the generated-artifact naming convention.
    #[must_use]
    pub fn is_generated(&self, path: &str) -> bool {
        self.generated.iter().any(|re| re.is_match(path))
    }

    /// Whether the path is an annotated interface source.
    #[must_use]
    pub fn is_interface_source(&self, path: &str) -> bool {
        self.interface_dirs.iter().any(|dir| path.contains(dir.as_str()))
            || self
                .interface_suffixes
                .iter()
                .any(|suffix| path.ends_with(suffix.as_str()))
    }

    fn within_suppression(&self, at: Instant, last_regenerate: Option<Instant>) -> bool {
        last_regenerate.is_some_and(|done| at.saturating_duration_since(done) < self.suppression)
    }
}

/// Render a path with forward slashes so conventions match on every platform.
fn normalized(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
