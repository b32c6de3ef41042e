//! The status flow: classify every output as ok, stale or missing.

use super::Project;
use super::reporter::Reporter;
use crate::errors::RunError;
use crate::locks::OutputState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub ok: usize,
    pub stale: usize,
    pub missing: usize,
}

impl StatusSummary {
    pub fn is_clean(&self) -> bool {
        self.stale == 0 && self.missing == 0
    }
}

/// Report the state of every output. Fails with [`RunError::OutOfDate`] when any
/// output is stale or missing.
pub fn status(project: &Project, reporter: &dyn Reporter) -> Result<StatusSummary, RunError> {
    let mut summary = StatusSummary::default();

    for source in &project.plan.sources {
        let snapshot = project.tracker.snapshot(source)?;
        for output in &source.outputs {
            let state = project.tracker.state_of(source, &snapshot, output);
            match state {
                OutputState::UpToDate => summary.ok += 1,
                OutputState::Stale => summary.stale += 1,
                OutputState::Missing => summary.missing += 1,
            }
            reporter.status(state, &Project::label(source, output));
        }
    }

    reporter.status_summary(summary.ok, summary.stale, summary.missing);
    if !summary.is_clean() {
        return Err(RunError::OutOfDate {
            stale: summary.stale,
            missing: summary.missing,
        });
    }
    Ok(summary)
}
