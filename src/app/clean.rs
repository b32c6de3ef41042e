//! The clean flow: remove generated outputs and their lock records.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Project;
use super::reporter::Reporter;
use crate::errors::RunError;
use crate::plan::output::{clean_path, escapes_root, to_slash};

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Report what would be removed without touching the filesystem.
    pub dry_run: bool,
    /// Also remove outputs and locks of sources that are no longer planned.
    pub orphans: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub removed: usize,
    pub missing: usize,
    pub locks_removed: usize,
}

enum Removal {
    Removed,
    Missing,
}

/// Resolve a root-relative path, refusing absolute paths and paths that leave the root.
pub fn resolve_within_root(root: &Path, rel: &str) -> Result<PathBuf, RunError> {
    let trimmed = rel.trim();
    if trimmed.is_empty() {
        return Err(RunError::UnsafePath {
            path: rel.to_string(),
            reason: "empty path",
        });
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Err(RunError::UnsafePath {
            path: rel.to_string(),
            reason: "absolute path",
        });
    }
    if escapes_root(path) {
        return Err(RunError::UnsafePath {
            path: rel.to_string(),
            reason: "path outside root",
        });
    }
    Ok(root.join(clean_path(path)))
}

fn remove(path: &Path, dry_run: bool) -> Result<Removal, RunError> {
    if dry_run {
        return Ok(if path.exists() {
            Removal::Removed
        } else {
            Removal::Missing
        });
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed");
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Removal::Missing),
        Err(source) => Err(RunError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}

struct Cleaner<'a> {
    root: &'a Path,
    dry_run: bool,
    reporter: &'a dyn Reporter,
    summary: CleanSummary,
}

impl Cleaner<'_> {
    fn display(&self, path: &Path) -> String {
        path.strip_prefix(self.root)
            .map(to_slash)
            .unwrap_or_else(|_| path.display().to_string())
    }

    fn output(&mut self, rel: &str) -> Result<(), RunError> {
        let abs = resolve_within_root(self.root, rel)?;
        match remove(&abs, self.dry_run)? {
            Removal::Removed => {
                self.summary.removed += 1;
                self.reporter.clean_removed(rel);
            }
            Removal::Missing => {
                self.summary.missing += 1;
                self.reporter.clean_missing(rel);
            }
        }
        Ok(())
    }

    fn lock(&mut self, path: &Path) -> Result<(), RunError> {
        let display = self.display(path);
        match remove(path, self.dry_run)? {
            Removal::Removed => {
                self.summary.locks_removed += 1;
                self.reporter.clean_removed(&display);
            }
            Removal::Missing => {
                self.summary.missing += 1;
                self.reporter.clean_missing(&display);
            }
        }
        Ok(())
    }
}

/// Remove every planned output and lock record, optionally including orphans.
pub fn clean(
    project: &Project,
    opts: CleanOptions,
    reporter: &dyn Reporter,
) -> Result<CleanSummary, RunError> {
    let mut cleaner = Cleaner {
        root: &project.root,
        dry_run: opts.dry_run,
        reporter,
        summary: CleanSummary::default(),
    };
    let store = project.tracker.store();

    let mut planned = BTreeSet::new();
    for source in &project.plan.sources {
        let key = source.source_key();
        for output in &source.outputs {
            cleaner.output(&to_slash(&output.output_path))?;
        }
        cleaner.lock(&store.lock_path(&key))?;
        planned.insert(key);
    }

    if opts.orphans {
        for lock_path in store.list()? {
            let lock = store.read_path(&lock_path)?;
            let key = Some(lock.source_path.trim().to_string())
                .filter(|key| !key.is_empty())
                .or_else(|| store.source_key_for(&lock_path))
                .unwrap_or_default();
            if planned.contains(&key) {
                continue;
            }
            debug!(source = %key, "Cleaning orphaned lock");
            for output in lock.outputs.values() {
                cleaner.output(&output.path)?;
            }
            cleaner.lock(&lock_path)?;
        }
    }

    reporter.clean_summary(
        cleaner.summary.removed,
        cleaner.summary.missing,
        cleaner.summary.locks_removed,
    );
    Ok(cleaner.summary)
}
