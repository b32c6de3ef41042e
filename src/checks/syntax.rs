//! Per-format syntax validation.

use crate::plan::Format;

const YAML_FENCE: &str = "---";
const TOML_FENCE: &str = "+++";

/// Check that `output` is well-formed for `format`. Text has no syntax phase.
pub fn validate_syntax(format: Format, output: &str) -> Result<(), String> {
    match format {
        Format::Json => serde_json::from_str::<serde_json::Value>(output)
            .map(|_| ())
            .map_err(|e| format!("json invalid: {e}")),
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(output)
            .map(|_| ())
            .map_err(|e| format!("yaml invalid: {e}")),
        Format::Po => validate_po(output),
        Format::Markdown => validate_markdown_frontmatter(output),
        Format::Text => Ok(()),
    }
}

/// Human label for the syntax phase of a format.
pub fn format_label(format: Format) -> &'static str {
    match format {
        Format::Json => "JSON",
        Format::Yaml => "YAML",
        Format::Po => "PO",
        Format::Markdown => "Markdown frontmatter",
        Format::Text => "text",
    }
}

/// A document opening with `---` or `+++` needs the matching closing fence, and the
/// enclosed block must parse as YAML or TOML respectively.
pub fn validate_markdown_frontmatter(content: &str) -> Result<(), String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let fence = match lines.first().map(|line| line.trim()) {
        Some(fence @ (YAML_FENCE | TOML_FENCE)) => fence,
        _ => return Ok(()),
    };
    let Some(end) = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == fence)
        .map(|offset| offset + 1)
    else {
        return Err(format!("markdown frontmatter missing closing {fence}"));
    };

    let block = lines[1..end].join("\n");
    if fence == YAML_FENCE {
        serde_yaml::from_str::<serde_yaml::Value>(&block)
            .map(|_| ())
            .map_err(|e| format!("markdown frontmatter invalid yaml: {e}"))
    } else {
        toml::from_str::<toml::Table>(&block)
            .map(|_| ())
            .map_err(|e| format!("markdown frontmatter invalid toml: {e}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoState {
    Idle,
    Msgid,
    Msgstr,
}

/// Gettext catalog state machine.
///
/// Every `msgid` needs a `msgstr` before the next entry, `msgid_plural` must follow an
/// open `msgid`, and quoted continuation lines need an open entry. Comments and blank
/// lines are skipped.
pub fn validate_po(content: &str) -> Result<(), String> {
    let mut state = PoState::Idle;
    let mut has_msgid = false;
    let mut has_msgstr = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("msgid ") {
            if has_msgid && !has_msgstr {
                return Err("po entry missing msgstr".to_string());
            }
            has_msgid = true;
            has_msgstr = false;
            state = PoState::Msgid;
            if !has_quoted_string(line) {
                return Err("po msgid missing quoted string".to_string());
            }
        } else if line.starts_with("msgid_plural ") {
            if state != PoState::Msgid {
                return Err("po msgid_plural without msgid".to_string());
            }
            if !has_quoted_string(line) {
                return Err("po msgid_plural missing quoted string".to_string());
            }
        } else if line.starts_with("msgstr") {
            if !has_msgid {
                return Err("po msgstr without msgid".to_string());
            }
            has_msgstr = true;
            state = PoState::Msgstr;
            if !has_quoted_string(line) {
                return Err("po msgstr missing quoted string".to_string());
            }
        } else if line.starts_with('"') {
            if state == PoState::Idle {
                return Err("po stray quoted string".to_string());
            }
        } else {
            return Err(format!("po invalid line: {line}"));
        }
    }

    if has_msgid && !has_msgstr {
        return Err("po entry missing msgstr".to_string());
    }
    Ok(())
}

/// At least two unescaped double quotes on the line.
fn has_quoted_string(line: &str) -> bool {
    let mut count = 0;
    let mut escaped = false;
    for c in line.chars() {
        if c == '\\' && !escaped {
            escaped = true;
            continue;
        }
        if c == '"' && !escaped {
            count += 1;
        }
        escaped = false;
    }
    count >= 2
}
