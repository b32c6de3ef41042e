//! Scaffold a project: a commented `L10N.md` plus git housekeeping lines.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use super::locales::locale_label;
use crate::descriptor::{DESCRIPTOR_FILE, validate_language};
use crate::l10n_config::STATE_DIR;

pub const GITIGNORE_LINE: &str = "/.l10n/tmp";
pub const GITATTRIBUTES_LINE: &str = ".l10n/locks/** linguist-generated=true";

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub source_lang: String,
    pub targets: Vec<String>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            source_lang: "en".to_string(),
            targets: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct InitResult {
    pub descriptor: PathBuf,
    pub gitignore_updated: bool,
    pub gitattributes_updated: bool,
}

/// Write the root descriptor template. Refuses to overwrite an existing `L10N.md`.
pub fn init(root: &Path, opts: &InitOptions) -> Result<InitResult> {
    let source_lang = validate_language(&opts.source_lang)?;
    let mut targets = opts
        .targets
        .iter()
        .map(|lang| validate_language(lang))
        .collect::<Result<Vec<_>, _>>()?;
    targets.sort();
    targets.dedup();
    targets.retain(|lang| *lang != source_lang);
    if targets.is_empty() {
        bail!("init needs at least one target language different from {source_lang}");
    }

    let descriptor = root.join(DESCRIPTOR_FILE);
    if descriptor.exists() {
        bail!("{} already exists at {}", DESCRIPTOR_FILE, descriptor.display());
    }

    std::fs::write(&descriptor, render_template(&source_lang, &targets))
        .with_context(|| format!("Failed to write {}", descriptor.display()))?;

    let state_dir = root.join(STATE_DIR);
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create directory: {}", state_dir.display()))?;

    Ok(InitResult {
        descriptor,
        gitignore_updated: ensure_line(&root.join(".gitignore"), GITIGNORE_LINE)?,
        gitattributes_updated: ensure_line(&root.join(".gitattributes"), GITATTRIBUTES_LINE)?,
    })
}

pub fn render_template(source_lang: &str, targets: &[String]) -> String {
    let quoted: Vec<String> = targets.iter().map(|lang| format!("{lang:?}")).collect();
    let labels: Vec<String> = targets.iter().map(|lang| locale_label(lang)).collect();

    format!(
        r#"+++
# Example configuration (uncomment to enable)
# [llm]
# provider = "openai"
# api_key = "{{{{env.OPENAI_API_KEY}}}}"
#
# [[llm.agent]]
# role = "coordinator"
# model = "gpt-4o-mini"
#
# [[llm.agent]]
# role = "translator"
# model = "gpt-4o"
#
# [[translate]]
# source = "docs/**/*.md"
# targets = [{targets}]
# output = "docs/i18n/{{lang}}/{{relpath}}"
+++

Uncomment the example above, then describe your product and tone here.
Source language: {source}.
Target languages: {labels}.

"#,
        targets = quoted.join(", "),
        source = locale_label(source_lang),
        labels = labels.join(", "),
    )
}

/// Append `line` unless an identical (trimmed) line is already present.
/// Returns whether the file changed.
pub fn ensure_line(path: &Path, line: &str) -> Result<bool> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content.replace("\r\n", "\n"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    if content.lines().any(|existing| existing.trim() == line.trim()) {
        return Ok(false);
    }

    let mut updated = content;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(line);
    updated.push('\n');
    std::fs::write(path, updated)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
