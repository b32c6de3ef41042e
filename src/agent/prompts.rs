//! Prompt construction and response post-processing.

use super::TranslationRequest;
use crate::checks::TOOLS_SUMMARY;
use crate::checks::preserve::resolve_preserve;
use crate::plan::Format;

pub const COORDINATOR_SYSTEM: &str = "You coordinate translations and produce concise briefs.";

const CODE_FENCE: &str = "```";

/// Static brief used when no coordinator model is configured.
pub fn default_brief(format: Format, frontmatter_preserved: bool) -> String {
    let mut lines = vec![
        "Translate the content faithfully and naturally.".to_string(),
        "Preserve code blocks, inline code, URLs, and placeholders.".to_string(),
        "Keep formatting, lists, and headings intact.".to_string(),
        "Return only the translated content.".to_string(),
    ];
    if format.is_structured() {
        lines.push(format!(
            "Return valid {format} only. Do not wrap in markdown fences."
        ));
    }
    if frontmatter_preserved {
        lines.push("Frontmatter is preserved separately; do not add new frontmatter.".to_string());
    }
    lines.push(format!("Tools run after translation: {TOOLS_SUMMARY}."));
    lines.join("\n")
}

pub fn coordinator_prompt(req: &TranslationRequest<'_>) -> String {
    let mut kinds: Vec<_> = resolve_preserve(&req.checks.preserve).into_iter().collect();
    kinds.sort();
    let preserve = if kinds.is_empty() {
        "none".to_string()
    } else {
        kinds
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "You are a localization coordinator.
Create a short translation brief for the translator.
The brief must be plain text and under 12 lines.

Target language: {}
Format: {}
Preserve: {}
Frontmatter mode: {}
Tools: {}

Context:
{}
",
        req.target_lang, req.format, preserve, req.frontmatter, TOOLS_SUMMARY, req.context
    )
}

pub fn translator_system(brief: &str) -> String {
    format!("You are a translation engine. Follow this brief:\n{brief}")
}

pub fn translator_prompt(
    lang: &str,
    context: &str,
    content: &str,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!("Translate to {lang}.\n\nContext:\n{context}\n\nSource:\n{content}");
    if let Some(feedback) = feedback {
        prompt.push_str(&format!(
            "\n\nPrevious output failed validation: {feedback}\nReturn a corrected full translation."
        ));
    }
    prompt
}

/// Split a leading `---` or `+++` block off a Markdown document.
///
/// The returned frontmatter includes both fence lines; the body starts after the closing
/// fence. `None` when the document has no complete frontmatter block.
pub fn split_markdown_frontmatter(contents: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = contents.split('\n').collect();
    let marker = lines.first()?.trim();
    if marker != "---" && marker != "+++" {
        return None;
    }
    let end = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == marker)?
        + 1;
    Some((lines[..=end].join("\n"), lines[end + 1..].join("\n")))
}

/// Remove one fenced-code wrapper around the whole response.
///
/// The first trimmed line must be the fence, optionally followed by a language tag, and
/// the last trimmed line must be exactly the fence. Anything else is returned unchanged.
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    let lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() < 2 {
        return content.to_string();
    }
    let opening = lines[0].trim();
    let closing = lines[lines.len() - 1].trim();
    let tag_ok = opening.strip_prefix(CODE_FENCE).is_some_and(|tag| {
        tag.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });
    if !tag_ok || closing != CODE_FENCE {
        return content.to_string();
    }
    lines[1..lines.len() - 1].join("\n")
}
