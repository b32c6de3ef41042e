//! Command flows: translate, check, status, clean and init.
//!
//! Each flow resolves the plan for a project, walks its (source, language) pairs in plan
//! order and reports progress through a [`Reporter`].

pub mod check;
pub mod clean;
pub mod init;
pub mod locales;
pub mod reporter;
pub mod status;
pub mod translate;

use std::path::{Path, PathBuf};

use crate::checks::Checker;
use crate::descriptor::DESCRIPTOR_FILE;
use crate::errors::RunError;
use crate::l10n_config::{L10nConfig, STATE_DIR};
use crate::locks::{LockStore, StalenessTracker};
use crate::plan::output::to_slash;
use crate::plan::{OutputPlan, Plan, SourcePlan};
pub use check::check;
pub use clean::{CleanOptions, CleanSummary, clean};
pub use init::{InitOptions, init};
pub use reporter::{NoopReporter, PairLabel, Reporter};
pub use status::{StatusSummary, status};
pub use translate::{PairOutcome, TranslateOptions, TranslateSummary, translate};

/// Locate the project root for `start`.
///
/// The nearest ancestor holding `.l10n/` or `.git` wins. Failing that, the outermost
/// ancestor holding an `L10N.md`. Failing that, `start` itself.
pub fn find_root(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if dir.join(STATE_DIR).is_dir() || dir.join(".git").exists() {
            return dir.to_path_buf();
        }
    }
    start
        .ancestors()
        .filter(|dir| dir.join(DESCRIPTOR_FILE).is_file())
        .last()
        .unwrap_or(start)
        .to_path_buf()
}

/// A resolved plan together with the services the flows share.
pub struct Project {
    pub root: PathBuf,
    pub plan: Plan,
    pub tracker: StalenessTracker,
    pub checker: Checker,
}

impl Project {
    /// Resolve the plan for `config.project_dir`. A plan with no sources is an error.
    pub fn open(config: &L10nConfig) -> Result<Self, RunError> {
        let plan = Plan::build(&config.project_dir)?;
        if plan.sources.is_empty() {
            return Err(RunError::NoSources);
        }
        let root = plan.root.clone();
        Ok(Self {
            tracker: StalenessTracker::new(&root, LockStore::new(config.lock_dir())),
            checker: Checker::new(&root, config.tmp_dir()),
            root,
            plan,
        })
    }

    pub fn output_abs(&self, output: &OutputPlan) -> PathBuf {
        self.root.join(&output.output_path)
    }

    pub fn label(source: &SourcePlan, output: &OutputPlan) -> PairLabel {
        PairLabel {
            source_path: source.source_key(),
            output_path: to_slash(&output.output_path),
            lang: output.lang.clone(),
        }
    }

    /// Every (source, output) pair in plan order.
    pub fn pairs(&self) -> impl Iterator<Item = (&SourcePlan, &OutputPlan)> {
        self.plan
            .sources
            .iter()
            .flat_map(|source| source.outputs.iter().map(move |output| (source, output)))
    }
}
