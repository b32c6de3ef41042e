//! `l10n check`

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use l10n::app::{Project, check};
use l10n::l10n_config::L10nConfig;
use l10n::ui::TerminalReporter;

pub async fn cmd_check(project_dir: &Path, check_cmd: Option<String>, verbose: bool) -> Result<()> {
    let config = L10nConfig::with_cli_args(project_dir.to_path_buf(), None, check_cmd, false)?;
    let project = Project::open(&config).context("Failed to resolve translation plan")?;
    let reporter = TerminalReporter::new(verbose);

    let checked = check(&project, config.check_cmd().as_deref(), &reporter).await?;
    println!(
        "{} {} outputs passed validation",
        style("OK:").bold().green(),
        checked
    );
    Ok(())
}
