//! User-visible run events.
//!
//! Components report what they skip, decide, and do through an [`EventSink`]
//! handed to them by the caller. The CLI uses [`TracingSink`]; tests and
//! previews can capture events with [`MemorySink`].

use crate::core::duplicate::DuplicateDecision;
use crate::error::{DecodeError, FsOpError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One filesystem mutation, planned or performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateDir { path: PathBuf },
    Copy { from: PathBuf, to: PathBuf },
    Move { from: PathBuf, to: PathBuf },
    Delete { path: PathBuf },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path } => write!(f, "mkdir {}", path.display()),
            Self::Copy { from, to } => write!(f, "copy {} → {}", from.display(), to.display()),
            Self::Move { from, to } => write!(f, "move {} → {}", from.display(), to.display()),
            Self::Delete { path } => write!(f, "remove {}", path.display()),
        }
    }
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::CreateDir { .. } => "mkdir",
            Self::Copy { .. } => "copy",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "remove",
        }
    }

    /// The source path, and the destination for transfers.
    pub fn paths(&self) -> (&Path, Option<&Path>) {
        match self {
            Self::CreateDir { path } | Self::Delete { path } => (path, None),
            Self::Copy { from, to } | Self::Move { from, to } => (from, Some(to)),
        }
    }
}

pub trait EventSink {
    /// An input was excluded because it could not be decoded.
    fn skipped(&self, path: &Path, error: &DecodeError);

    fn duplicate(&self, decision: &DuplicateDecision);

    /// Emitted before the action is attempted, and in dry runs instead of it.
    fn action(&self, action: &Action, dry_run: bool);

    fn failed(&self, action: &Action, error: &FsOpError);
}

/// Forwards events to `tracing` with the affected paths as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn skipped(&self, path: &Path, error: &DecodeError) {
        tracing::warn!(path = %path.display(), %error, "Skipping unreadable image");
    }

    fn duplicate(&self, decision: &DuplicateDecision) {
        tracing::info!(
            discarded = %decision.discarded.display(),
            kept = %decision.kept.display(),
            distance = decision.distance,
            "Duplicate found"
        );
    }

    fn action(&self, action: &Action, dry_run: bool) {
        let verb = action.verb();
        match action.paths() {
            (from, Some(to)) => {
                tracing::info!(from = %from.display(), to = %to.display(), dry_run, "{verb}")
            }
            (path, None) => tracing::info!(path = %path.display(), dry_run, "{verb}"),
        }
    }

    fn failed(&self, action: &Action, error: &FsOpError) {
        let verb = action.verb();
        let error = error.io_error();
        match action.paths() {
            (from, Some(to)) => {
                tracing::error!(from = %from.display(), to = %to.display(), %error, "Failed to {verb}")
            }
            (path, None) => tracing::error!(path = %path.display(), %error, "Failed to {verb}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Skipped { path: PathBuf, reason: String },
    Duplicate(DuplicateDecision),
    Action { action: Action, dry_run: bool },
    Failed { action: Action, reason: String },
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    fn push(&self, event: Event) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Action { action, .. } => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<Action> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Failed { action, .. } => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_paths(&self) -> Vec<PathBuf> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Skipped { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn skipped(&self, path: &Path, error: &DecodeError) {
        self.push(Event::Skipped {
            path: path.to_path_buf(),
            reason: error.to_string(),
        });
    }

    fn duplicate(&self, decision: &DuplicateDecision) {
        self.push(Event::Duplicate(decision.clone()));
    }

    fn action(&self, action: &Action, dry_run: bool) {
        self.push(Event::Action {
            action: action.clone(),
            dry_run,
        });
    }

    fn failed(&self, action: &Action, error: &FsOpError) {
        self.push(Event::Failed {
            action: action.clone(),
            reason: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        let action = Action::Move {
            from: PathBuf::from("/in/a.jpg"),
            to: PathBuf::from("/out/1920x1080/a.jpg"),
        };
        assert_eq!(action.to_string(), "move /in/a.jpg → /out/1920x1080/a.jpg");
        assert_eq!(
            Action::CreateDir {
                path: PathBuf::from("/out")
            }
            .to_string(),
            "mkdir /out"
        );
    }

    #[test]
    fn test_action_fields() {
        let copy = Action::Copy {
            from: PathBuf::from("/in/a.jpg"),
            to: PathBuf::from("/out/a.jpg"),
        };
        assert_eq!(copy.verb(), "copy");
        assert_eq!(
            copy.paths(),
            (Path::new("/in/a.jpg"), Some(Path::new("/out/a.jpg")))
        );

        let delete = Action::Delete {
            path: PathBuf::from("/in/b.jpg"),
        };
        assert_eq!(delete.verb(), "remove");
        assert_eq!(delete.paths(), (Path::new("/in/b.jpg"), None));
    }

    #[test]
    fn test_failure_detail_omits_paths() {
        let error = FsOpError::Move {
            from: PathBuf::from("/in/a.jpg"),
            to: PathBuf::from("/out/a.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let detail = error.io_error().to_string();
        assert_eq!(detail, "denied");
        assert!(error.to_string().ends_with(&detail));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::default();
        let first = Action::Delete {
            path: PathBuf::from("/a.jpg"),
        };
        let second = Action::Delete {
            path: PathBuf::from("/b.jpg"),
        };
        sink.action(&first, true);
        sink.skipped(
            Path::new("/c.jpg"),
            &DecodeError::EmptyImage {
                width: 0,
                height: 0,
            },
        );
        sink.action(&second, true);

        assert_eq!(sink.actions(), vec![first, second]);
        assert_eq!(sink.skipped_paths(), vec![PathBuf::from("/c.jpg")]);
        assert_eq!(sink.events().len(), 3);
    }
}
