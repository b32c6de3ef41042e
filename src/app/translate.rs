//! The translate flow: find stale pairs, translate them and record the results.

use tracing::{debug, info};

use super::Project;
use super::reporter::{PairLabel, Reporter};
use crate::agent::{Agent, DEFAULT_RETRIES, TranslationRequest};
use crate::checks::CheckOptions;
use crate::errors::RunError;
use crate::l10n_config::FailurePolicy;
use crate::locks::SourceSnapshot;
use crate::plan::{OutputPlan, SourcePlan};

#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Treat every pair as stale.
    pub force: bool,
    /// Report the pairs that would be translated without calling the backend.
    pub dry_run: bool,
    /// Run-wide retries; wins over directive `retries`.
    pub retries: Option<u32>,
    /// Project default used when neither the run nor the directive sets retries.
    pub default_retries: Option<u32>,
    /// Run-wide check command; replaces directive check commands.
    pub check_cmd: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl TranslateOptions {
    fn retries_for(&self, source: &SourcePlan) -> u32 {
        self.retries
            .or(source.directive.retries)
            .or(self.default_retries)
            .unwrap_or(DEFAULT_RETRIES)
    }
}

/// What happened to one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    UpToDate,
    DryRun,
    Written,
    Failed { tool: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateSummary {
    /// Pairs selected for translation.
    pub total: usize,
    pub up_to_date: usize,
    pub dry_run: usize,
    pub written: usize,
    pub failed: usize,
    pub outcomes: Vec<(PairLabel, PairOutcome)>,
}

impl TranslateSummary {
    fn record(&mut self, label: PairLabel, outcome: PairOutcome) {
        match outcome {
            PairOutcome::UpToDate => self.up_to_date += 1,
            PairOutcome::DryRun => self.dry_run += 1,
            PairOutcome::Written => self.written += 1,
            PairOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push((label, outcome));
    }
}

struct SourceWork<'p> {
    source: &'p SourcePlan,
    snapshot: SourceSnapshot,
    pending: Vec<&'p OutputPlan>,
}

/// Translate every stale pair of the project.
///
/// Successful languages are persisted as soon as they finish, so a later failure never
/// loses earlier work. Under [`FailurePolicy::Abort`] the first failed pair ends the run;
/// under [`FailurePolicy::Continue`] the remaining pairs still run and the failures are
/// reported together at the end.
pub async fn translate(
    project: &Project,
    agent: &Agent,
    opts: &TranslateOptions,
    reporter: &dyn Reporter,
) -> Result<TranslateSummary, RunError> {
    let mut summary = TranslateSummary::default();
    let mut work = Vec::with_capacity(project.plan.sources.len());

    for source in &project.plan.sources {
        let snapshot = project.tracker.snapshot(source)?;
        let mut pending = Vec::new();
        for output in &source.outputs {
            if !opts.force && project.tracker.is_up_to_date(source, &snapshot, output) {
                summary.record(Project::label(source, output), PairOutcome::UpToDate);
                continue;
            }
            pending.push(output);
        }
        summary.total += pending.len();
        work.push(SourceWork {
            source,
            snapshot,
            pending,
        });
    }

    if summary.total == 0 {
        reporter.info("no translations needed");
        return Ok(summary);
    }

    let total = summary.total;
    let mut step = 0;
    for SourceWork {
        source,
        mut snapshot,
        pending,
    } in work
    {
        if pending.is_empty() {
            continue;
        }
        let source_text = snapshot.text().to_string();
        let checks = CheckOptions::for_directive(&source.directive, opts.check_cmd.as_deref());
        let retries = opts.retries_for(source);

        for output in pending {
            step += 1;
            let label = Project::label(source, output);
            reporter.activity("Translating", step, total, &label);

            if opts.dry_run {
                reporter.info(&format!("dry-run {label}"));
                summary.record(label, PairOutcome::DryRun);
                continue;
            }

            let context = source.context_string_for(&output.lang);
            let request = TranslationRequest {
                source: &source_text,
                target_lang: &output.lang,
                format: source.format,
                context: &context,
                frontmatter: source.directive.frontmatter,
                checks: &checks,
                retries,
                coordinator: &source.llm.coordinator,
                translator: &source.llm.translator,
            };

            match agent.translate(&request).await {
                Ok(text) => {
                    write_output(project, output, &text)?;
                    project
                        .tracker
                        .record_success(source, &mut snapshot, output, &text)?;
                    debug!(pair = %label, "Translation written");
                    reporter.pair_written(&label);
                    summary.record(label, PairOutcome::Written);
                }
                Err(error) => {
                    reporter.pair_failed(&label, &error);
                    let tool = error.tool();
                    summary.record(label, PairOutcome::Failed { tool });
                    if opts.failure_policy == FailurePolicy::Abort {
                        return Err(RunError::TranslationFailed {
                            source_path: source.source_path.clone(),
                            lang: output.lang.clone(),
                            error,
                        });
                    }
                    info!(tool, "Continuing after failed translation: {error}");
                }
            }
        }
    }

    if summary.failed > 0 {
        return Err(RunError::PartialFailure {
            failed: summary.failed,
            total,
        });
    }
    Ok(summary)
}

fn write_output(project: &Project, output: &OutputPlan, text: &str) -> Result<(), RunError> {
    let path = project.output_abs(output);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RunError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, text).map_err(|source| RunError::Write { path, source })
}
