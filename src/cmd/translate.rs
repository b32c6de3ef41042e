//! `l10n translate`

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;

use l10n::agent::Agent;
use l10n::app::{Project, TranslateOptions, translate};
use l10n::l10n_config::L10nConfig;
use l10n::llm::LlmClient;
use l10n::ui::TerminalReporter;

pub struct TranslateArgs {
    pub force: bool,
    pub retries: Option<u32>,
    pub dry_run: bool,
    pub check_cmd: Option<String>,
    pub keep_going: bool,
}

pub async fn cmd_translate(project_dir: &Path, args: TranslateArgs, verbose: bool) -> Result<()> {
    let config = L10nConfig::with_cli_args(
        project_dir.to_path_buf(),
        args.retries,
        args.check_cmd,
        args.keep_going,
    )?;
    let opts = TranslateOptions {
        force: args.force,
        dry_run: args.dry_run,
        retries: config.retries()?,
        default_retries: config.default_retries(),
        check_cmd: config.check_cmd(),
        failure_policy: config.failure_policy()?,
    };

    let project = Project::open(&config).context("Failed to resolve translation plan")?;
    let agent = Agent::new(Arc::new(LlmClient::new()), project.checker.clone());
    let reporter = TerminalReporter::new(verbose);

    let result = translate(&project, &agent, &opts, &reporter).await;
    reporter.finish();
    let summary = result?;

    if summary.total > 0 {
        println!();
        if opts.dry_run {
            println!(
                "{} {} translations would run",
                style("Dry run:").bold(),
                summary.dry_run
            );
        } else {
            println!(
                "{} {} written, {} up to date",
                style("Done:").bold().green(),
                summary.written,
                summary.up_to_date
            );
        }
    }
    Ok(())
}
