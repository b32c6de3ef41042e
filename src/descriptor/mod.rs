//! Descriptor files (`L10N.md`).
//!
//! A descriptor is a markdown document with an optional TOML header fenced by `+++`
//! lines. The header declares translation directives and backend settings; the body is
//! free-text context handed to the translator.
//!
//! ```text
//! +++
//! [llm]
//! provider = "openai"
//! translator_model = "gpt-4o"
//!
//! [[translate]]
//! source = "docs/**/*.md"
//! targets = ["es", "de"]
//! output = "i18n/{lang}/{relpath}"
//! +++
//! The product is called Acme. Keep the tone friendly.
//! ```
//!
//! Directives are normalized into immutable [`Directive`] records at load time, so the
//! rest of the crate never looks at legacy or optional fields.

pub mod llm;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
pub use llm::{AgentConfig, LlmConfig};

/// File name of a descriptor, matched exactly anywhere in the tree.
pub const DESCRIPTOR_FILE: &str = "L10N.md";

/// Directory beside a descriptor holding per-language context files (`L10N/<lang>.md`).
pub const LANG_CONTEXT_DIR: &str = "L10N";

/// Placeholders recognised in output templates.
pub const OUTPUT_PLACEHOLDERS: [&str; 4] = ["{lang}", "{relpath}", "{basename}", "{ext}"];

const HEADER_FENCE: &str = "+++";

/// How Markdown frontmatter is handled during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontmatterMode {
    /// Split frontmatter off before translation and re-attach it verbatim
    #[default]
    Preserve,
    /// Send frontmatter to the translator with the rest of the document
    Translate,
}

impl std::fmt::Display for FrontmatterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrontmatterMode::Preserve => write!(f, "preserve"),
            FrontmatterMode::Translate => write!(f, "translate"),
        }
    }
}

impl std::str::FromStr for FrontmatterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(FrontmatterMode::Preserve),
            "translate" => Ok(FrontmatterMode::Translate),
            other => Err(other.to_string()),
        }
    }
}

/// Raw `[[translate]]` entry as written in the header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslateEntry {
    #[serde(default)]
    pub source: Option<String>,
    /// Legacy name for `source`
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub preserve: Vec<String>,
    #[serde(default)]
    pub frontmatter: Option<String>,
    #[serde(default)]
    pub check_cmd: Option<String>,
    #[serde(default)]
    pub check_cmds: BTreeMap<String, String>,
    #[serde(default)]
    pub retries: Option<u32>,
}

impl TranslateEntry {
    /// The source pattern, falling back to the legacy `path` field when `source` is blank.
    pub fn source_pattern(&self) -> &str {
        match self.source.as_deref() {
            Some(source) if !source.trim().is_empty() => source,
            _ => self.path.as_deref().unwrap_or(""),
        }
    }

    /// Validate and normalize into a [`Directive`].
    pub fn normalize(
        self,
        origin: &DescriptorOrigin,
        index: usize,
    ) -> Result<Directive, ConfigError> {
        let source = self.source_pattern().trim().to_string();
        let invalid = |message: String| ConfigError::InvalidDirective {
            path: origin.path.clone(),
            message,
        };

        if source.is_empty() {
            return Err(invalid("translate entry requires source/path".to_string()));
        }
        if self.targets.is_empty() {
            return Err(invalid(format!("translate entry {:?} has no targets", source)));
        }
        let output = self.output.as_deref().unwrap_or("").trim().to_string();
        if output.is_empty() {
            return Err(invalid(format!("translate entry {:?} has no output", source)));
        }

        let mut targets = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            targets.push(validate_language(target)?);
        }

        let frontmatter = match self.frontmatter.as_deref().map(str::trim) {
            None | Some("") => FrontmatterMode::default(),
            Some(mode) => mode
                .parse()
                .map_err(|mode| ConfigError::InvalidFrontmatterMode {
                    path: origin.path.clone(),
                    pattern: source.clone(),
                    mode,
                })?,
        };

        Ok(Directive {
            source,
            targets,
            output,
            exclude: self.exclude,
            preserve: self.preserve,
            frontmatter,
            check_cmd: self
                .check_cmd
                .filter(|cmd| !cmd.trim().is_empty()),
            check_cmds: self.check_cmds,
            retries: self.retries,
            origin: origin.clone(),
            index,
        })
    }
}

/// Where a directive was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorOrigin {
    /// Absolute path of the descriptor file
    pub path: PathBuf,
    /// Absolute directory containing the descriptor
    pub dir: PathBuf,
    /// Path-segment count from the project root to `dir` (root = 0)
    pub depth: usize,
}

/// A normalized translation directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Source glob, relative to the origin directory
    pub source: String,
    pub targets: Vec<String>,
    /// Output template with `{lang}`, `{relpath}`, `{basename}` and `{ext}`
    pub output: String,
    pub exclude: Vec<String>,
    pub preserve: Vec<String>,
    pub frontmatter: FrontmatterMode,
    pub check_cmd: Option<String>,
    pub check_cmds: BTreeMap<String, String>,
    pub retries: Option<u32>,
    pub origin: DescriptorOrigin,
    /// Declaration index within the origin descriptor
    pub index: usize,
}

impl Directive {
    /// Precedence key: deeper descriptors win, then later declarations.
    pub fn precedence(&self) -> (usize, usize) {
        (self.origin.depth, self.index)
    }
}

/// Structured header of a descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptorHeader {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub translate: Vec<TranslateEntry>,
}

/// One parsed descriptor file.
#[derive(Debug, Clone)]
pub struct DescriptorFile {
    pub origin: DescriptorOrigin,
    pub body: String,
    pub llm: LlmConfig,
    pub directives: Vec<Directive>,
}

impl DescriptorFile {
    /// Load and parse a descriptor located `depth` directories below the project root.
    pub fn load(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let path = std::path::absolute(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path, depth)
    }

    /// Parse descriptor contents.
    pub fn parse(contents: &str, path: PathBuf, depth: usize) -> Result<Self, ConfigError> {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let origin = DescriptorOrigin { path, dir, depth };

        let (header, body) = match split_toml_frontmatter(contents) {
            Ok(Some((header, body))) => {
                let header: DescriptorHeader =
                    toml::from_str(&header).map_err(|source| ConfigError::Parse {
                        path: origin.path.clone(),
                        source,
                    })?;
                (header, body)
            }
            Ok(None) => (DescriptorHeader::default(), contents.to_string()),
            Err(UnclosedFence) => {
                return Err(ConfigError::UnclosedFrontmatter {
                    path: origin.path.clone(),
                });
            }
        };

        let directives = header
            .translate
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.normalize(&origin, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            body,
            llm: header.llm,
            directives,
        })
    }

    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// Header fence opened but never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclosedFence;

/// Split a `+++`-fenced TOML header from the body.
///
/// Returns `Ok(None)` when the first line is not a fence.
pub fn split_toml_frontmatter(contents: &str) -> Result<Option<(String, String)>, UnclosedFence> {
    let lines: Vec<&str> = contents.split('\n').collect();
    if lines.first().map(|line| line.trim()) != Some(HEADER_FENCE) {
        return Ok(None);
    }
    let end = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == HEADER_FENCE)
        .map(|offset| offset + 1)
        .ok_or(UnclosedFence)?;

    Ok(Some((lines[1..end].join("\n"), lines[end + 1..].join("\n"))))
}

/// Trim a language code and reject empty codes or codes containing path separators.
pub fn validate_language(lang: &str) -> Result<String, ConfigError> {
    let trimmed = lang.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        return Err(ConfigError::InvalidLanguage(lang.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Path of the per-language context file beside a descriptor directory.
pub fn lang_context_path(dir: &Path, lang: &str) -> Result<PathBuf, ConfigError> {
    let lang = validate_language(lang)?;
    Ok(dir.join(LANG_CONTEXT_DIR).join(format!("{}.md", lang)))
}

/// Read a per-language context file, stripping any TOML header.
/// Returns `None` when the file does not exist.
pub fn read_lang_context(dir: &Path, lang: &str) -> Result<Option<String>, ConfigError> {
    let path = lang_context_path(dir, lang)?;
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    match split_toml_frontmatter(&contents) {
        Ok(Some((_, body))) => Ok(Some(body)),
        Ok(None) => Ok(Some(contents)),
        Err(UnclosedFence) => Err(ConfigError::UnclosedFrontmatter { path }),
    }
}
