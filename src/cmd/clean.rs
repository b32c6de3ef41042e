//! `l10n clean`

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use l10n::app::{CleanOptions, Project, clean};
use l10n::l10n_config::L10nConfig;
use l10n::ui::TerminalReporter;

pub fn cmd_clean(project_dir: &Path, opts: CleanOptions, verbose: bool) -> Result<()> {
    let config = L10nConfig::new(project_dir.to_path_buf())?;
    let project = Project::open(&config).context("Failed to resolve translation plan")?;

    if opts.dry_run {
        println!("{}", style("Dry run: nothing will be removed").yellow());
    }
    clean(&project, opts, &TerminalReporter::new(verbose))?;
    Ok(())
}
