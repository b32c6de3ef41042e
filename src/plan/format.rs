//! Source format detection.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Markdown,
    Json,
    Yaml,
    /// Gettext catalog (line-record `msgid`/`msgstr` pairs)
    Po,
    Text,
}

impl Format {
    /// Detect the format from a file extension, case-insensitively.
    pub fn detect(path: &str) -> Self {
        let ext = path
            .rfind('.')
            .map(|idx| path[idx + 1..].to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "md" | "markdown" => Format::Markdown,
            "json" => Format::Json,
            "yaml" | "yml" => Format::Yaml,
            "po" => Format::Po,
            _ => Format::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Po => "po",
            Format::Text => "text",
        }
    }

    /// Formats the translator must return as a bare document, without a fenced wrapper.
    pub fn is_structured(&self) -> bool {
        matches!(self, Format::Json | Format::Yaml | Format::Po)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
