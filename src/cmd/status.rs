//! `l10n status` and `l10n plan`

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use l10n::app::{Project, status};
use l10n::l10n_config::L10nConfig;
use l10n::plan::output::to_slash;
use l10n::ui::TerminalReporter;

pub fn cmd_status(project_dir: &Path, verbose: bool) -> Result<()> {
    let config = L10nConfig::new(project_dir.to_path_buf())?;
    let project = Project::open(&config).context("Failed to resolve translation plan")?;
    status(&project, &TerminalReporter::new(verbose))?;
    Ok(())
}

/// List every resolved source with its winning descriptor and outputs.
pub fn cmd_plan(project_dir: &Path) -> Result<()> {
    let config = L10nConfig::new(project_dir.to_path_buf())?;
    let project = Project::open(&config).context("Failed to resolve translation plan")?;

    for source in &project.plan.sources {
        let descriptor = source
            .directive
            .origin
            .path
            .strip_prefix(&project.root)
            .map(to_slash)
            .unwrap_or_else(|_| source.directive.origin.path.display().to_string());

        println!(
            "{} {} {}",
            style(source.source_key()).cyan().bold(),
            style(format!("[{}]", source.format)).dim(),
            style(format!("via {descriptor}")).dim()
        );
        for output in &source.outputs {
            println!(
                "  {} {} {}",
                style("→").dim(),
                style(&output.lang).yellow(),
                to_slash(&output.output_path)
            );
        }
    }
    println!();
    println!(
        "{} sources, {} outputs",
        project.plan.sources.len(),
        project.pairs().count()
    );
    Ok(())
}
