//! Source-tree watching and change classification.

mod classify;
mod error;
mod event;
mod source;
mod tree;

pub use classify::{ChangeClassifier, Classification, RegenerateMarks};
pub use error::WatcherError;
pub use event::{ChangeEvent, ChangeKind};
pub use source::{WatchMessage, WatchSource};
pub use tree::{collect_watch_dirs, is_excluded_dir, is_excluded_path};
