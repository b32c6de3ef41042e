//! Project settings for l10n runs.
//!
//! Settings live in `.l10n/config.toml` next to the lock files:
//!
//! ```toml
//! [run]
//! retries = 3
//! failure_policy = "continue"
//!
//! [checks]
//! check_cmd = "markdownlint {path}"
//! ```
//!
//! `L10nConfig` layers the file, then `L10N_*` environment variables, then CLI flags.
//! `retries` is the exception: the file value is only a default beneath directive
//! `retries`, while the CLI and environment override directives.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const STATE_DIR: &str = ".l10n";
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_RETRIES: &str = "L10N_RETRIES";
pub const ENV_FAILURE_POLICY: &str = "L10N_FAILURE_POLICY";
pub const ENV_CHECK_CMD: &str = "L10N_CHECK_CMD";

/// Highest retry count accepted before `validate` warns.
const MAX_SENSIBLE_RETRIES: u32 = 10;

/// What a run does after a pair exhausts its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed pair.
    #[default]
    Abort,
    /// Keep translating the remaining pairs and fail at the end.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            _ => bail!(
                "Invalid failure policy '{}'. Valid values: abort, continue",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    /// Project default for extra attempts per pair. Directive `retries` wins over this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksSection {
    /// Command run against every output, replacing directive check commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_cmd: Option<String>,
}

/// The complete `.l10n/config.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct L10nToml {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub checks: ChecksSection,
}

impl L10nToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse .l10n/config.toml")
    }

    /// Load `config.toml` from the state directory, or defaults when it doesn't exist.
    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(self).context("Failed to serialize .l10n/config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(retries) = self.run.retries
            && retries > MAX_SENSIBLE_RETRIES
        {
            warnings.push(format!(
                "run.retries = {} is unusually high; each retry is a full generation request",
                retries
            ));
        }

        if let Some(ref cmd) = self.checks.check_cmd {
            if cmd.trim().is_empty() {
                warnings.push("checks.check_cmd is empty and will be ignored".to_string());
            } else if !cmd.contains(crate::checks::external::PATH_PLACEHOLDER) {
                warnings.push(format!(
                    "checks.check_cmd '{}' has no {{path}} placeholder; the output file will not be passed to it",
                    cmd
                ));
            }
        }

        warnings
    }
}

/// Run settings merged from the config file, environment and CLI.
#[derive(Debug, Clone)]
pub struct L10nConfig {
    /// Project root all descriptor and output paths are relative to
    pub project_dir: PathBuf,
    /// Path to the `.l10n` directory
    pub state_dir: PathBuf,
    /// Parsed `config.toml`
    pub toml: L10nToml,
    pub cli_retries: Option<u32>,
    pub cli_check_cmd: Option<String>,
    /// `--keep-going` forces the continue policy
    pub cli_keep_going: bool,
}

impl L10nConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let state_dir = project_dir.join(STATE_DIR);
        let toml = L10nToml::load_or_default(&state_dir)?;

        Ok(Self {
            project_dir,
            state_dir,
            toml,
            cli_retries: None,
            cli_check_cmd: None,
            cli_keep_going: false,
        })
    }

    /// Create L10nConfig with CLI overrides.
    pub fn with_cli_args(
        project_dir: PathBuf,
        retries: Option<u32>,
        check_cmd: Option<String>,
        keep_going: bool,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.cli_retries = retries;
        config.cli_check_cmd = check_cmd.filter(|cmd| !cmd.trim().is_empty());
        config.cli_keep_going = keep_going;
        Ok(config)
    }

    /// Run-level retries override (CLI → env). `None` defers to directives.
    pub fn retries(&self) -> Result<Option<u32>> {
        if let Some(retries) = self.cli_retries {
            return Ok(Some(retries));
        }
        if let Ok(value) = std::env::var(ENV_RETRIES)
            && !value.trim().is_empty()
        {
            let retries = value
                .trim()
                .parse::<u32>()
                .with_context(|| format!("{ENV_RETRIES} must be a non-negative integer"))?;
            return Ok(Some(retries));
        }
        Ok(None)
    }

    /// Project-wide retries from the config file, used when a directive sets none.
    pub fn default_retries(&self) -> Option<u32> {
        self.toml.run.retries
    }

    /// Failure policy (CLI → env → file).
    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        if self.cli_keep_going {
            return Ok(FailurePolicy::Continue);
        }
        if let Ok(value) = std::env::var(ENV_FAILURE_POLICY)
            && !value.trim().is_empty()
        {
            return value.parse();
        }
        Ok(self.toml.run.failure_policy)
    }

    /// Check command override (CLI → env → file).
    pub fn check_cmd(&self) -> Option<String> {
        self.cli_check_cmd
            .clone()
            .or_else(|| {
                std::env::var(ENV_CHECK_CMD)
                    .ok()
                    .filter(|cmd| !cmd.trim().is_empty())
            })
            .or_else(|| {
                self.toml
                    .checks
                    .check_cmd
                    .clone()
                    .filter(|cmd| !cmd.trim().is_empty())
            })
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.state_dir.join("locks")
    }

    /// Scratch directory for external check temp files.
    pub fn tmp_dir(&self) -> PathBuf {
        self.state_dir.join("tmp")
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
