use crate::error::FsOpError;
use crate::services::events::{Action, EventSink};
use crate::services::filesystem::{Filesystem, Transfer};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Per-batch counts. In a dry run `applied` counts the actions that would have run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub applied: usize,
    pub failed: usize,
}

impl Outcome {
    fn record(&mut self, result: Result<(), FsOpError>, action: &Action, sink: &dyn EventSink) {
        match result {
            Ok(()) => self.applied += 1,
            Err(error) => {
                sink.failed(action, &error);
                self.failed += 1;
            }
        }
    }
}

/// Applies planned filesystem changes one path at a time.
///
/// Every action is reported before it is attempted. With `dry_run` set,
/// actions are reported in the same order and nothing is touched.
pub struct Materializer<'a> {
    fs: &'a dyn Filesystem,
    sink: &'a dyn EventSink,
    dry_run: bool,
}

impl<'a> Materializer<'a> {
    pub fn new(fs: &'a dyn Filesystem, sink: &'a dyn EventSink, dry_run: bool) -> Self {
        Self { fs, sink, dry_run }
    }

    /// Creates each missing directory. Existing ones are skipped silently.
    pub fn create_directories(&self, dirs: &BTreeSet<PathBuf>) -> Outcome {
        let mut outcome = Outcome::default();
        for dir in dirs {
            if self.fs.is_dir(dir) {
                continue;
            }
            let action = Action::CreateDir { path: dir.clone() };
            self.sink.action(&action, self.dry_run);
            if self.dry_run {
                outcome.applied += 1;
                continue;
            }
            let result = self
                .fs
                .create_dir_all(dir)
                .map_err(|source| FsOpError::CreateDir {
                    path: dir.clone(),
                    source,
                });
            outcome.record(result, &action, self.sink);
        }
        outcome
    }

    /// Copies or moves every source to its destination, in mapping order.
    pub fn apply_mapping(&self, mapping: &[(PathBuf, PathBuf)], transfer: Transfer) -> Outcome {
        let mut outcome = Outcome::default();
        for (from, to) in mapping {
            let action = match transfer {
                Transfer::Copy => Action::Copy {
                    from: from.clone(),
                    to: to.clone(),
                },
                Transfer::Move => Action::Move {
                    from: from.clone(),
                    to: to.clone(),
                },
            };
            self.sink.action(&action, self.dry_run);
            if self.dry_run {
                outcome.applied += 1;
                continue;
            }
            let result = match transfer {
                Transfer::Copy => self.copy(from, to),
                Transfer::Move => self.move_file(from, to),
            };
            outcome.record(result, &action, self.sink);
        }
        outcome
    }

    pub fn delete_paths(&self, paths: &[PathBuf]) -> Outcome {
        let mut outcome = Outcome::default();
        for path in paths {
            let action = Action::Delete { path: path.clone() };
            self.sink.action(&action, self.dry_run);
            if self.dry_run {
                outcome.applied += 1;
                continue;
            }
            let result = self
                .fs
                .remove_file(path)
                .map_err(|source| FsOpError::Delete {
                    path: path.clone(),
                    source,
                });
            outcome.record(result, &action, self.sink);
        }
        outcome
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsOpError> {
        self.fs.copy(from, to).map_err(|source| FsOpError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
    }

    /// Renames, falling back to copy + remove when a rename is not possible
    /// (e.g. across devices).
    fn move_file(&self, from: &Path, to: &Path) -> Result<(), FsOpError> {
        let failed = |source: std::io::Error| FsOpError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        };
        let Err(error) = self.fs.rename(from, to) else {
            return Ok(());
        };
        tracing::debug!(%error, from = %from.display(), "Rename failed; copying instead");
        self.fs.copy(from, to).map_err(failed)?;
        self.fs.remove_file(from).map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::events::MemorySink;
    use crate::services::filesystem::LocalFilesystem;
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    /// Local filesystem whose renames always fail, as across devices.
    struct NoRenameFs;

    impl Filesystem for NoRenameFs {
        fn is_dir(&self, path: &Path) -> bool {
            LocalFilesystem.is_dir(path)
        }
        fn is_file(&self, path: &Path) -> bool {
            LocalFilesystem.is_file(path)
        }
        fn same_file(&self, a: &Path, b: &Path) -> bool {
            LocalFilesystem.same_file(a, b)
        }
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            LocalFilesystem.create_dir_all(path)
        }
        fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
            LocalFilesystem.copy(from, to)
        }
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::other("cross-device link"))
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            LocalFilesystem.remove_file(path)
        }
    }

    fn tree_listing(root: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .map(|entry| entry.path().to_path_buf())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let src = root.join("a.jpg");
        let victim = root.join("b.jpg");
        fs::write(&src, b"a").unwrap();
        fs::write(&victim, b"b").unwrap();
        let before = tree_listing(root);

        let sink = MemorySink::default();
        let materializer = Materializer::new(&LocalFilesystem, &sink, true);
        let out = root.join("out");
        let bucket = out.join("1920x1080");
        let dirs = BTreeSet::from([out.clone(), bucket.clone()]);
        let mapping = vec![(src.clone(), bucket.join("a.jpg"))];

        assert_eq!(materializer.create_directories(&dirs).applied, 2);
        assert_eq!(materializer.apply_mapping(&mapping, Transfer::Move).applied, 1);
        assert_eq!(materializer.delete_paths(&[victim.clone()]).applied, 1);

        assert_eq!(tree_listing(root), before);
        assert_eq!(
            sink.actions(),
            vec![
                Action::CreateDir { path: out },
                Action::CreateDir {
                    path: bucket.clone()
                },
                Action::Move {
                    from: src,
                    to: bucket.join("a.jpg")
                },
                Action::Delete { path: victim },
            ]
        );
    }

    #[test]
    fn test_existing_directories_are_not_reported() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink::default();
        let materializer = Materializer::new(&LocalFilesystem, &sink, false);

        let outcome =
            materializer.create_directories(&BTreeSet::from([temp_dir.path().to_path_buf()]));

        assert_eq!(outcome, Outcome::default());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_copy_and_move() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("keep.jpg"), b"keep").unwrap();
        fs::write(root.join("go.jpg"), b"go").unwrap();
        let out = root.join("out");
        fs::create_dir_all(&out).unwrap();

        let sink = MemorySink::default();
        let materializer = Materializer::new(&LocalFilesystem, &sink, false);
        let copied = materializer.apply_mapping(
            &[(root.join("keep.jpg"), out.join("keep.jpg"))],
            Transfer::Copy,
        );
        let moved = materializer.apply_mapping(
            &[(root.join("go.jpg"), out.join("go.jpg"))],
            Transfer::Move,
        );

        assert_eq!(copied.applied, 1);
        assert_eq!(moved.applied, 1);
        assert!(root.join("keep.jpg").exists());
        assert_eq!(fs::read(out.join("keep.jpg")).unwrap(), b"keep");
        assert!(!root.join("go.jpg").exists());
        assert_eq!(fs::read(out.join("go.jpg")).unwrap(), b"go");
    }

    #[test]
    fn test_move_falls_back_to_copy_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.jpg"), b"a").unwrap();
        fs::create_dir_all(root.join("out")).unwrap();

        let sink = MemorySink::default();
        let materializer = Materializer::new(&NoRenameFs, &sink, false);
        let outcome = materializer.apply_mapping(
            &[(root.join("a.jpg"), root.join("out").join("a.jpg"))],
            Transfer::Move,
        );

        assert_eq!(outcome.applied, 1);
        assert!(!root.join("a.jpg").exists());
        assert!(root.join("out").join("a.jpg").exists());
        assert!(sink.failures().is_empty());
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("present.jpg"), b"p").unwrap();
        // A file where a directory should go makes that bucket impossible
        fs::write(root.join("blocked"), b"").unwrap();

        let sink = MemorySink::default();
        let materializer = Materializer::new(&LocalFilesystem, &sink, false);

        let dirs = BTreeSet::from([root.join("blocked").join("1920x1080"), root.join("ok")]);
        let created = materializer.create_directories(&dirs);
        assert_eq!(created, Outcome { applied: 1, failed: 1 });

        let mapping = vec![
            (root.join("missing.jpg"), root.join("ok").join("missing.jpg")),
            (root.join("present.jpg"), root.join("ok").join("present.jpg")),
        ];
        let copied = materializer.apply_mapping(&mapping, Transfer::Copy);
        assert_eq!(copied, Outcome { applied: 1, failed: 1 });
        assert!(root.join("ok").join("present.jpg").exists());

        let deleted = materializer.delete_paths(&[root.join("missing.jpg")]);
        assert_eq!(deleted, Outcome { applied: 0, failed: 1 });

        assert_eq!(sink.failures().len(), 3);
    }
}
