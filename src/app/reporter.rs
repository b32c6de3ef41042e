//! Progress and result callbacks for the command flows.

use crate::errors::TranslateError;
use crate::locks::OutputState;

/// One (source, output, language) pair as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairLabel {
    pub source_path: String,
    pub output_path: String,
    pub lang: String,
}

impl std::fmt::Display for PairLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.source_path, self.output_path, self.lang
        )
    }
}

/// Receives events from the command flows. Every method defaults to a no-op.
pub trait Reporter: Send + Sync {
    fn info(&self, _message: &str) {}

    /// A pair is about to be processed; `step` is 1-based out of `total`.
    fn activity(&self, _verb: &str, _step: usize, _total: usize, _pair: &PairLabel) {}

    fn pair_written(&self, _pair: &PairLabel) {}

    fn pair_failed(&self, _pair: &PairLabel, _error: &TranslateError) {}

    fn status(&self, _state: OutputState, _pair: &PairLabel) {}

    fn status_summary(&self, _ok: usize, _stale: usize, _missing: usize) {}

    fn clean_removed(&self, _path: &str) {}

    fn clean_missing(&self, _path: &str) {}

    fn clean_summary(&self, _removed: usize, _missing: usize, _locks_removed: usize) {}

    /// Start a determinate progress display over `total` items.
    fn progress_start(&self, _label: &str, _total: usize) {}

    fn progress_increment(&self, _item: &str) {}

    fn progress_done(&self) {}
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}
