//! Typed error hierarchy for l10n.
//!
//! The enums follow the run's failure classes:
//! - `ConfigError`: malformed descriptors, invalid directives, unknown roles (fatal)
//! - `PlanError`: discovery, glob and output collision failures while resolving the plan (fatal)
//! - `LockError`: lock record I/O (fatal)
//! - `LlmError`: generation backend failures (recoverable per attempt)
//! - `CheckFailure`: a validation tool rejected the output (recoverable per attempt)
//! - `TranslateError`: a single pair could not be translated
//! - `RunError`: command-level failures

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and normalizing descriptor files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: frontmatter start found but no closing +++")]
    UnclosedFrontmatter { path: PathBuf },

    #[error("{path}: failed to parse frontmatter: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path}: {message}")]
    InvalidDirective { path: PathBuf, message: String },

    #[error("{path}: translate entry {pattern:?} has invalid frontmatter mode {mode:?}")]
    InvalidFrontmatterMode {
        path: PathBuf,
        pattern: String,
        mode: String,
    },

    #[error("llm.agent requires role")]
    MissingRole,

    #[error("unknown llm.agent role {0:?}")]
    UnknownRole(String),

    #[error("invalid language code {0:?}")]
    InvalidLanguage(String),
}

/// Errors raised while resolving descriptors into source plans.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to scan project tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid glob {pattern}: {message}")]
    Glob { pattern: String, message: String },

    #[error("Failed to inspect {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output {output} is produced by both {first} and {second}")]
    OutputCollision {
        output: String,
        first: String,
        second: String,
    },
}

/// Errors from reading or writing lock records.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to read lock file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lock file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write lock file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize lock record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors surfaced by the generation backend client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm base_url is required")]
    MissingBaseUrl,

    #[error("llm model is required")]
    MissingModel,

    #[error("unsupported message role {role:?} for {provider}")]
    UnsupportedRole { provider: String, role: String },

    #[error("llm request requires user messages")]
    NoUserMessages,

    #[error("llm error: {message}")]
    Status { status: u16, message: String },

    #[error("llm response missing {0}")]
    EmptyResponse(&'static str),

    #[error("llm request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("llm response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A validation tool rejected produced output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{tool} tool failed: {message}")]
pub struct CheckFailure {
    /// Name of the check that failed (`syntax-validator`, `preserve-check`, `custom-command`)
    pub tool: &'static str,
    pub message: String,
}

impl CheckFailure {
    pub fn new(tool: &'static str, message: impl Into<String>) -> Self {
        Self {
            tool,
            message: message.into(),
        }
    }
}

/// Failure of a single translation attempt. Both variants consume a retry slot.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Backend(#[from] LlmError),

    #[error(transparent)]
    Validation(#[from] CheckFailure),
}

impl AttemptFailure {
    /// Name of the tool responsible for the failure.
    pub fn tool(&self) -> &'static str {
        match self {
            AttemptFailure::Backend(_) => "llm",
            AttemptFailure::Validation(failure) => failure.tool,
        }
    }
}

/// Errors from translating one (source, language) pair.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translator model is required")]
    MissingTranslatorModel,

    #[error("coordinator brief failed: {0}")]
    Brief(#[source] LlmError),

    #[error("{last} (after {attempts} attempts)")]
    Exhausted {
        attempts: u32,
        #[source]
        last: AttemptFailure,
    },
}

impl TranslateError {
    /// Name of the tool that caused the pair to fail.
    pub fn tool(&self) -> &'static str {
        match self {
            TranslateError::MissingTranslatorModel | TranslateError::Brief(_) => "llm",
            TranslateError::Exhausted { last, .. } => last.tool(),
        }
    }
}

/// Command-level errors.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no sources found")]
    NoSources,

    #[error("missing output: {0}")]
    MissingOutput(PathBuf),

    #[error("translate {source_path} ({lang}): {error}")]
    TranslationFailed {
        source_path: PathBuf,
        lang: String,
        #[source]
        error: TranslateError,
    },

    #[error("check failed for {output} ({lang}): {failure}")]
    CheckFailed {
        output: PathBuf,
        lang: String,
        #[source]
        failure: CheckFailure,
    },

    #[error("{failed} of {total} translations failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("translations out of date ({stale} stale, {missing} missing)")]
    OutOfDate { stale: usize, missing: usize },

    #[error("refusing to remove {path}: {reason}")]
    UnsafePath { path: String, reason: &'static str },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl RunError {
    /// Whether the error belongs to the fatal class (configuration, resolution or
    /// filesystem) rather than a per-pair translation or validation failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RunError::TranslationFailed { .. }
                | RunError::CheckFailed { .. }
                | RunError::PartialFailure { .. }
                | RunError::OutOfDate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_failure_carries_tool_name() {
        let failure = CheckFailure::new("preserve-check", "missing `code`");
        assert_eq!(failure.tool, "preserve-check");
        assert_eq!(
            failure.to_string(),
            "preserve-check tool failed: missing `code`"
        );
    }

    #[test]
    fn attempt_failure_reports_responsible_tool() {
        let backend: AttemptFailure = LlmError::EmptyResponse("choices").into();
        assert_eq!(backend.tool(), "llm");

        let validation: AttemptFailure = CheckFailure::new("syntax-validator", "bad").into();
        assert_eq!(validation.tool(), "syntax-validator");
    }

    #[test]
    fn exhausted_error_surfaces_last_failure() {
        let err = TranslateError::Exhausted {
            attempts: 3,
            last: CheckFailure::new("custom-command", "exit status 1").into(),
        };
        assert_eq!(err.tool(), "custom-command");
        let message = err.to_string();
        assert!(message.contains("custom-command tool failed"));
        assert!(message.contains("3 attempts"));
    }

    #[test]
    fn run_error_classifies_fatal_and_recoverable() {
        assert!(RunError::NoSources.is_fatal());
        assert!(RunError::Plan(PlanError::Config(ConfigError::MissingRole)).is_fatal());
        assert!(
            RunError::Write {
                path: PathBuf::from("out/es/guide.md"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            }
            .is_fatal()
        );

        let failed = RunError::TranslationFailed {
            source_path: PathBuf::from("docs/guide.md"),
            lang: "es".to_string(),
            error: TranslateError::MissingTranslatorModel,
        };
        assert!(!failed.is_fatal());
        assert!(!RunError::PartialFailure { failed: 1, total: 2 }.is_fatal());
    }

    #[test]
    fn config_error_unknown_role_is_matchable() {
        let err = ConfigError::UnknownRole("reviewer".to_string());
        match &err {
            ConfigError::UnknownRole(role) => assert_eq!(role, "reviewer"),
            _ => panic!("Expected UnknownRole"),
        }
        assert!(err.to_string().contains("reviewer"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ConfigError::MissingRole);
        assert_std_error(&LlmError::MissingModel);
        assert_std_error(&CheckFailure::new("syntax-validator", "x"));
        assert_std_error(&TranslateError::MissingTranslatorModel);
        assert_std_error(&RunError::NoSources);
    }
}
