//! `l10n init`

use anyhow::Result;
use console::style;
use std::path::Path;

use l10n::app::init::{GITATTRIBUTES_LINE, GITIGNORE_LINE};
use l10n::app::{InitOptions, init};
use l10n::descriptor::DESCRIPTOR_FILE;

pub fn cmd_init(project_dir: &Path, opts: InitOptions) -> Result<()> {
    let result = init(project_dir, &opts)?;

    println!("{} Created {}", style("✓").green(), result.descriptor.display());
    if result.gitignore_updated {
        println!("{} Added {} to .gitignore", style("✓").green(), GITIGNORE_LINE);
    }
    if result.gitattributes_updated {
        println!(
            "{} Added {} to .gitattributes",
            style("✓").green(),
            GITATTRIBUTES_LINE
        );
    }
    println!();
    println!("Next steps:");
    println!("  1. Open {DESCRIPTOR_FILE} and uncomment the example config.");
    println!("  2. Update source globs, targets, and output paths for your repo.");
    println!("  3. Set OPENAI_API_KEY (or change the provider/model settings).");
    println!("  4. Run `l10n translate` to generate drafts.");
    Ok(())
}
