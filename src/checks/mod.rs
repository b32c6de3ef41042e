//! Validation engine.
//!
//! Produced text goes through three ordered phases, stopping at the first failure:
//! 1. syntax: the output must be well-formed for its format
//! 2. preserve: protected tokens from the source must survive verbatim
//! 3. external: an optional user command must exit successfully

pub mod external;
pub mod preserve;
pub mod syntax;

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::descriptor::Directive;
use crate::errors::CheckFailure;
use crate::plan::Format;
use external::ExternalCheck;
use preserve::{resolve_preserve, validate_preserve};
use syntax::{format_label, validate_syntax};

pub const SYNTAX_TOOL: &str = "syntax-validator";
pub const PRESERVE_TOOL: &str = "preserve-check";
pub const CUSTOM_COMMAND_TOOL: &str = "custom-command";

/// One-line description of the checks, shared with the translator prompts.
pub const TOOLS_SUMMARY: &str = "syntax validators (JSON, YAML, PO, Markdown frontmatter), preserve checks (code blocks, inline code, URLs, placeholders), and optional custom commands";

/// Per-source validation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub preserve: Vec<String>,
    /// Command used for every format unless `check_cmds` has an entry for it
    pub check_cmd: Option<String>,
    /// Per-format commands keyed by format name
    pub check_cmds: BTreeMap<String, String>,
}

impl CheckOptions {
    /// Options for a directive. A run-wide command replaces both the directive's command
    /// and its per-format table.
    pub fn for_directive(directive: &Directive, override_cmd: Option<&str>) -> Self {
        match override_cmd.map(str::trim).filter(|cmd| !cmd.is_empty()) {
            Some(cmd) => Self {
                preserve: directive.preserve.clone(),
                check_cmd: Some(cmd.to_string()),
                check_cmds: BTreeMap::new(),
            },
            None => Self {
                preserve: directive.preserve.clone(),
                check_cmd: directive.check_cmd.clone(),
                check_cmds: directive.check_cmds.clone(),
            },
        }
    }

    /// Command to run for `format`, if any.
    pub fn select_check_cmd(&self, format: Format) -> Option<&str> {
        self.check_cmds
            .get(format.as_str())
            .map(String::as_str)
            .filter(|cmd| !cmd.trim().is_empty())
            .or_else(|| {
                self.check_cmd
                    .as_deref()
                    .map(str::trim)
                    .filter(|cmd| !cmd.is_empty())
            })
    }
}

/// Runs the validation phases for a project.
#[derive(Debug, Clone)]
pub struct Checker {
    external: ExternalCheck,
}

impl Checker {
    /// `root` is the working directory of check commands, `tmp_dir` holds scratch files.
    pub fn new(root: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            external: ExternalCheck::new(root, tmp_dir),
        }
    }

    pub async fn validate(
        &self,
        format: Format,
        output: &str,
        source: &str,
        options: &CheckOptions,
    ) -> Result<(), CheckFailure> {
        debug!(tool = SYNTAX_TOOL, "parse {}", format_label(format));
        validate_syntax(format, output).map_err(|e| CheckFailure::new(SYNTAX_TOOL, e))?;

        let kinds = resolve_preserve(&options.preserve);
        if !kinds.is_empty() {
            debug!(tool = PRESERVE_TOOL, "verify preserved tokens");
            validate_preserve(output, source, &kinds)
                .map_err(|e| CheckFailure::new(PRESERVE_TOOL, e))?;
        }

        if let Some(command) = options.select_check_cmd(format) {
            debug!(tool = CUSTOM_COMMAND_TOOL, "run check command");
            self.external
                .run(command, output)
                .await
                .map_err(|e| CheckFailure::new(CUSTOM_COMMAND_TOOL, e))?;
        }

        Ok(())
    }
}
