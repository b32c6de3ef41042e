//! Lock records and staleness tracking.
//!
//! Each source file gets one JSON record under `.l10n/locks/`, mirroring its path
//! (`docs/guide.md` → `.l10n/locks/docs/guide.md.lock`). A record stores the source hash
//! and, per language, the output path, output hash and context hash of the last
//! successful translation.
//!
//! Staleness only depends on content: source bytes, context text, output path and the
//! record itself. Timestamps are informational.

pub mod hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{LockError, RunError};
use crate::plan::output::to_slash;
use crate::plan::{OutputPlan, SourcePlan};
pub use hash::{hash_bytes, hash_parts, hash_str};

pub const LOCK_EXTENSION: &str = "lock";

/// Persisted cache record for one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    pub source_path: String,
    pub source_hash: String,
    /// Record-wide context hash written by older versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_hash: Option<String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputLock>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLock {
    /// Output path relative to the project root, `/`-separated
    pub path: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_hash: Option<String>,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
}

impl LockFile {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Context hash recorded for `lang`, falling back to the legacy record-wide hash.
    pub fn context_hash_for(&self, lang: &str) -> Option<&str> {
        self.outputs
            .get(lang)
            .and_then(|output| output.context_hash.as_deref())
            .filter(|hash| !hash.is_empty())
            .or(self.context_hash.as_deref())
    }
}

/// Reads and writes lock records in one directory.
#[derive(Debug, Clone)]
pub struct LockStore {
    lock_dir: PathBuf,
}

impl LockStore {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Path of the record for a `/`-separated source path.
    pub fn lock_path(&self, source_key: &str) -> PathBuf {
        let mut path = self.lock_dir.clone();
        for segment in source_key.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.set_file_name(format!(
            "{}.{}",
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            LOCK_EXTENSION
        ));
        path
    }

    /// Source path mirrored by a lock file path, used when a record lacks `source_path`.
    pub fn source_key_for(&self, lock_path: &Path) -> Option<String> {
        let rel = lock_path.strip_prefix(&self.lock_dir).ok()?;
        let key = to_slash(rel);
        key.strip_suffix(&format!(".{}", LOCK_EXTENSION))
            .map(str::to_string)
    }

    /// Load the record for a source, `None` when it was never written.
    pub fn read(&self, source_key: &str) -> Result<Option<LockFile>, LockError> {
        let path = self.lock_path(source_key);
        match std::fs::read_to_string(&path) {
            Ok(content) => parse_lock(&path, &content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LockError::Read { path, source }),
        }
    }

    /// Load a record from an explicit lock file path.
    pub fn read_path(&self, path: &Path) -> Result<LockFile, LockError> {
        let content = std::fs::read_to_string(path).map_err(|source| LockError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_lock(path, &content)
    }

    /// Persist the whole record, stamping `updated_at`.
    pub fn write(&self, lock: &mut LockFile) -> Result<PathBuf, LockError> {
        lock.updated_at = Some(Utc::now());
        let path = self.lock_path(&lock.source_path);
        let content = serde_json::to_string_pretty(lock).map_err(LockError::Serialize)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LockError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, content).map_err(|source| LockError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(lock = %path.display(), outputs = lock.outputs.len(), "Wrote lock record");
        Ok(path)
    }

    /// Every `.lock` file under the lock directory, sorted.
    pub fn list(&self) -> Result<Vec<PathBuf>, LockError> {
        if !self.lock_dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(&self.lock_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| LockError::Read {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.lock_dir.clone()),
                source: e.into(),
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == LOCK_EXTENSION)
            {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

fn parse_lock(path: &Path, content: &str) -> Result<LockFile, LockError> {
    serde_json::from_str(content).map_err(|source| LockError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Staleness of one (source, language) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    UpToDate,
    Stale,
    Missing,
}

impl std::fmt::Display for OutputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputState::UpToDate => write!(f, "ok"),
            OutputState::Stale => write!(f, "stale"),
            OutputState::Missing => write!(f, "missing"),
        }
    }
}

/// Everything staleness depends on for one output.
#[derive(Debug, Clone, Copy)]
pub struct OutputFingerprint<'a> {
    pub lang: &'a str,
    pub output_exists: bool,
    pub source_hash: &'a str,
    pub output_path: &'a str,
    pub context_hash: &'a str,
}

/// Decide whether an output is current. Pure function of its inputs.
pub fn evaluate(fingerprint: &OutputFingerprint<'_>, lock: Option<&LockFile>) -> OutputState {
    if !fingerprint.output_exists {
        return OutputState::Missing;
    }
    let Some(lock) = lock else {
        return OutputState::Stale;
    };
    let Some(output) = lock.outputs.get(fingerprint.lang) else {
        return OutputState::Stale;
    };
    let current = lock.source_hash == fingerprint.source_hash
        && output.path == fingerprint.output_path
        && lock.context_hash_for(fingerprint.lang) == Some(fingerprint.context_hash);
    if current {
        OutputState::UpToDate
    } else {
        OutputState::Stale
    }
}

/// Source content and lock record captured once per source per run.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub key: String,
    pub content: String,
    pub hash: String,
    /// Existing record, or a fresh one when none was written yet
    pub lock: LockFile,
    pub has_lock: bool,
}

impl SourceSnapshot {
    pub fn text(&self) -> &str {
        &self.content
    }
}

/// Decides which outputs need work and records successful translations.
#[derive(Debug, Clone)]
pub struct StalenessTracker {
    root: PathBuf,
    store: LockStore,
}

impl StalenessTracker {
    pub fn new(root: impl Into<PathBuf>, store: LockStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    pub fn store(&self) -> &LockStore {
        &self.store
    }

    pub fn load(&self, source_key: &str) -> Result<Option<LockFile>, LockError> {
        self.store.read(source_key)
    }

    /// Read the source and its lock record.
    /// Read the source and its lock record. Sources that are not valid UTF-8 are rejected.
    pub fn snapshot(&self, source: &SourcePlan) -> Result<SourceSnapshot, RunError> {
        let content = std::fs::read_to_string(&source.abs_path).map_err(|e| RunError::Read {
            path: source.abs_path.clone(),
            source: e,
        })?;
        let key = source.source_key();
        let existing = self.load(&key)?;
        Ok(SourceSnapshot {
            hash: hash_bytes(content.as_bytes()),
            has_lock: existing.is_some(),
            lock: existing.unwrap_or_else(|| LockFile::new(key.clone())),
            key,
            content,
        })
    }

    pub fn context_hash(source: &SourcePlan, lang: &str) -> String {
        hash_parts(&source.context_parts_for(lang))
    }

    pub fn state_of(
        &self,
        source: &SourcePlan,
        snapshot: &SourceSnapshot,
        output: &OutputPlan,
    ) -> OutputState {
        let context_hash = Self::context_hash(source, &output.lang);
        let output_path = to_slash(&output.output_path);
        let fingerprint = OutputFingerprint {
            lang: &output.lang,
            output_exists: self.root.join(&output.output_path).is_file(),
            source_hash: &snapshot.hash,
            output_path: &output_path,
            context_hash: &context_hash,
        };
        evaluate(&fingerprint, snapshot.has_lock.then_some(&snapshot.lock))
    }

    pub fn is_up_to_date(
        &self,
        source: &SourcePlan,
        snapshot: &SourceSnapshot,
        output: &OutputPlan,
    ) -> bool {
        self.state_of(source, snapshot, output) == OutputState::UpToDate
    }

    /// Update the record for one successful language and persist it in full.
    pub fn record_success(
        &self,
        source: &SourcePlan,
        snapshot: &mut SourceSnapshot,
        output: &OutputPlan,
        text: &str,
    ) -> Result<(), LockError> {
        let lock = &mut snapshot.lock;
        lock.source_path = snapshot.key.clone();
        lock.source_hash = snapshot.hash.clone();
        lock.outputs.insert(
            output.lang.clone(),
            OutputLock {
                path: to_slash(&output.output_path),
                hash: hash_str(text),
                context_hash: Some(Self::context_hash(source, &output.lang)),
                checked_at: Some(Utc::now()),
            },
        );
        self.store.write(lock)?;
        snapshot.has_lock = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;
    use tempfile::tempdir;

    fn fingerprint<'a>(context_hash: &'a str) -> OutputFingerprint<'a> {
        OutputFingerprint {
            lang: "es",
            output_exists: true,
            source_hash: "source-hash",
            output_path: "out/es/guide.md",
            context_hash,
        }
    }

    fn current_lock() -> LockFile {
        let mut lock = LockFile::new("docs/guide.md");
        lock.source_hash = "source-hash".to_string();
        lock.outputs.insert(
            "es".to_string(),
            OutputLock {
                path: "out/es/guide.md".to_string(),
                hash: "out-hash".to_string(),
                context_hash: Some("ctx".to_string()),
                checked_at: None,
            },
        );
        lock
    }

    #[test]
    fn test_write_read_lock_round_trip() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path().join(".l10n/locks"));
        let mut lock = current_lock();
        lock.context_hash = Some("legacy".to_string());

        let path = store.write(&mut lock).unwrap();
        assert_eq!(path, dir.path().join(".l10n/locks/docs/guide.md.lock"));

        let read = store.read("docs/guide.md").unwrap().unwrap();
        assert_eq!(read.source_hash, lock.source_hash);
        assert_eq!(read.context_hash, lock.context_hash);
        assert_eq!(read.outputs["es"].hash, "out-hash");
        assert_eq!(read.outputs["es"].context_hash.as_deref(), Some("ctx"));
        assert!(read.updated_at.is_some());
    }

    #[test]
    fn test_read_missing_lock_is_none() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path());
        assert!(store.read("nope.md").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_lock_is_an_error() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path());
        std::fs::write(dir.path().join("a.md.lock"), "{not json").unwrap();
        assert!(matches!(
            store.read("a.md").unwrap_err(),
            LockError::Parse { .. }
        ));
    }

    #[test]
    fn test_legacy_lock_without_output_context_hash() {
        let lock: LockFile = serde_json::from_str(
            r#"{
  "source_path": "docs/guide.md",
  "source_hash": "source-hash",
  "context_hash": "legacy",
  "outputs": {
    "es": { "path": "out/es/guide.md", "hash": "h", "checked_at": "2026-02-03T00:00:00Z" }
  },
  "updated_at": "2026-02-03T00:00:00Z"
}"#,
        )
        .unwrap();
        assert_eq!(lock.context_hash_for("es"), Some("legacy"));
        assert_eq!(
            evaluate(&fingerprint("legacy"), Some(&lock)),
            OutputState::UpToDate
        );
    }

    #[test]
    fn test_evaluate_mismatches() {
        let lock = current_lock();
        assert_eq!(
            evaluate(&fingerprint("ctx"), Some(&lock)),
            OutputState::UpToDate
        );
        assert_eq!(evaluate(&fingerprint("other"), Some(&lock)), OutputState::Stale);
        assert_eq!(evaluate(&fingerprint("ctx"), None), OutputState::Stale);

        let moved = OutputFingerprint {
            output_path: "out/moved/es/guide.md",
            ..fingerprint("ctx")
        };
        assert_eq!(evaluate(&moved, Some(&lock)), OutputState::Stale);

        let edited = OutputFingerprint {
            source_hash: "edited",
            ..fingerprint("ctx")
        };
        assert_eq!(evaluate(&edited, Some(&lock)), OutputState::Stale);

        let other_lang = OutputFingerprint {
            lang: "de",
            ..fingerprint("ctx")
        };
        assert_eq!(evaluate(&other_lang, Some(&lock)), OutputState::Stale);

        let missing = OutputFingerprint {
            output_exists: false,
            ..fingerprint("ctx")
        };
        assert_eq!(evaluate(&missing, Some(&lock)), OutputState::Missing);
    }

    #[test]
    fn test_lock_path_mirrors_source_and_back() {
        let store = LockStore::new("/project/.l10n/locks");
        let path = store.lock_path("docs/guide.md");
        assert_eq!(path, PathBuf::from("/project/.l10n/locks/docs/guide.md.lock"));
        assert_eq!(store.source_key_for(&path).as_deref(), Some("docs/guide.md"));
    }

    #[test]
    fn test_record_success_then_up_to_date() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("L10N.md"),
            "+++\n[[translate]]\nsource = \"guide.md\"\ntargets = [\"es\", \"de\"]\noutput = \"out/{lang}/{relpath}\"\n+++\nCtx\n",
        )
        .unwrap();
        std::fs::write(root.join("guide.md"), "Hello").unwrap();

        let plan = Plan::build(root).unwrap();
        let source = &plan.sources[0];
        let tracker = StalenessTracker::new(root, LockStore::new(root.join(".l10n/locks")));
        let mut snapshot = tracker.snapshot(source).unwrap();
        assert!(!snapshot.has_lock);

        let es = &source.outputs[0];
        assert_eq!(es.lang, "es");
        assert_eq!(tracker.state_of(source, &snapshot, es), OutputState::Missing);

        std::fs::create_dir_all(root.join("out/es")).unwrap();
        std::fs::write(root.join(&es.output_path), "Hola").unwrap();
        tracker
            .record_success(source, &mut snapshot, es, "Hola")
            .unwrap();

        let fresh = tracker.snapshot(source).unwrap();
        assert!(tracker.is_up_to_date(source, &fresh, es));
        assert!(!tracker.is_up_to_date(source, &fresh, &source.outputs[1]));

        let stored = tracker.load("guide.md").unwrap().unwrap();
        assert_eq!(stored.outputs["es"].hash, hash_str("Hola"));
        assert_eq!(stored.source_hash, hash_bytes(b"Hello"));

        std::fs::write(root.join("guide.md"), "Hello!").unwrap();
        let edited = tracker.snapshot(source).unwrap();
        assert_eq!(tracker.state_of(source, &edited, es), OutputState::Stale);
    }

    #[test]
    fn test_snapshot_rejects_non_utf8_source() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("L10N.md"),
            "+++\n[[translate]]\nsource = \"guide.md\"\ntargets = [\"es\"]\noutput = \"out/{lang}/{relpath}\"\n+++\n",
        )
        .unwrap();
        std::fs::write(root.join("guide.md"), [b'H', b'i', 0xff, 0xfe]).unwrap();

        let plan = Plan::build(root).unwrap();
        let tracker = StalenessTracker::new(root, LockStore::new(root.join(".l10n/locks")));
        let err = tracker.snapshot(&plan.sources[0]).unwrap_err();
        match err {
            RunError::Read { path, source } => {
                assert!(path.ends_with("guide.md"));
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
            }
            other => panic!("Expected Read error, got {other:?}"),
        }
    }

    #[test]
    fn test_list_locks() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path().join("locks"));
        assert!(store.list().unwrap().is_empty());

        let mut a = LockFile::new("a.md");
        let mut b = LockFile::new("nested/b.md");
        store.write(&mut a).unwrap();
        store.write(&mut b).unwrap();

        let keys: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .filter_map(|path| store.source_key_for(path))
            .collect();
        assert_eq!(keys, vec!["a.md", "nested/b.md"]);
    }
}
