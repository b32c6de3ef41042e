//! Preserve-token extraction and verification.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::warn;

static CODE_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)"'<>]+"#).unwrap());
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^\s{}]+\}").unwrap());

/// Characters dropped from the end of a URL match.
const URL_TRAILING_PUNCTUATION: [char; 8] = ['.', ',', ';', ':', '!', '?', ']', '*'];

/// Most missing tokens listed in one failure.
const MAX_MISSING: usize = 5;

/// Value that disables preserve checks entirely.
pub const PRESERVE_NONE: &str = "none";

/// Category of substrings that must survive translation verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreserveKind {
    CodeBlocks,
    InlineCode,
    Urls,
    Placeholders,
}

impl PreserveKind {
    pub const ALL: [PreserveKind; 4] = [
        PreserveKind::CodeBlocks,
        PreserveKind::InlineCode,
        PreserveKind::Urls,
        PreserveKind::Placeholders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreserveKind::CodeBlocks => "code_blocks",
            PreserveKind::InlineCode => "inline_code",
            PreserveKind::Urls => "urls",
            PreserveKind::Placeholders => "placeholders",
        }
    }
}

impl std::str::FromStr for PreserveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code_blocks" => Ok(PreserveKind::CodeBlocks),
            "inline_code" => Ok(PreserveKind::InlineCode),
            "urls" => Ok(PreserveKind::Urls),
            "placeholders" => Ok(PreserveKind::Placeholders),
            other => Err(other.to_string()),
        }
    }
}

/// Resolve the declared categories. Unset means all four, `none` disables the phase and
/// unrecognised names are ignored.
pub fn resolve_preserve(preserve: &[String]) -> HashSet<PreserveKind> {
    let declared: Vec<&str> = preserve
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();
    if declared.is_empty() {
        return PreserveKind::ALL.into_iter().collect();
    }
    if declared
        .iter()
        .any(|value| value.eq_ignore_ascii_case(PRESERVE_NONE))
    {
        return HashSet::new();
    }

    declared
        .into_iter()
        .filter_map(|value| match value.parse() {
            Ok(kind) => Some(kind),
            Err(unknown) => {
                warn!(category = %unknown, "Ignoring unknown preserve category");
                None
            }
        })
        .collect()
}

/// Tokens in `source` belonging to `kinds`, in extraction order and deduplicated by first
/// occurrence. Fenced blocks are cut out of the text before the other categories scan it.
pub fn extract_preservables(source: &str, kinds: &HashSet<PreserveKind>) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |token: &str| {
        if !token.is_empty() && seen.insert(token.to_string()) {
            tokens.push(token.to_string());
        }
    };

    let mut text = std::borrow::Cow::Borrowed(source);
    if kinds.contains(&PreserveKind::CodeBlocks) {
        for block in CODE_BLOCK_REGEX.find_iter(&text) {
            push(block.as_str());
        }
        // A line break keeps tokens on either side of a removed block from joining
        text = std::borrow::Cow::Owned(CODE_BLOCK_REGEX.replace_all(&text, "\n").into_owned());
    }
    if kinds.contains(&PreserveKind::InlineCode) {
        for code in INLINE_CODE_REGEX.find_iter(&text) {
            push(code.as_str());
        }
    }
    if kinds.contains(&PreserveKind::Urls) {
        for url in URL_REGEX.find_iter(&text) {
            push(url.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION));
        }
    }
    if kinds.contains(&PreserveKind::Placeholders) {
        for placeholder in PLACEHOLDER_REGEX.find_iter(&text) {
            push(placeholder.as_str());
        }
    }

    tokens
}

/// Every token extracted from `source` must appear verbatim in `output`.
pub fn validate_preserve(
    output: &str,
    source: &str,
    kinds: &HashSet<PreserveKind>,
) -> Result<(), String> {
    let missing: Vec<String> = extract_preservables(source, kinds)
        .into_iter()
        .filter(|token| !output.contains(token.as_str()))
        .take(MAX_MISSING)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("preserved tokens missing from output: {missing:?}"))
    }
}
