//! Environment references in header values and API keys.
//!
//! Three spellings are recognised: `{{env.NAME}}` anywhere in the value, a value that
//! is exactly `env.NAME`, and inline `env:NAME` tokens terminated by `/` or whitespace.

use regex::Regex;
use std::sync::LazyLock;

static ENV_TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

const ENV_PREFIX: &str = "env.";
const ENV_TOKEN: &str = "env:";

/// Expand environment references using the process environment.
pub fn expand_env(value: &str) -> String {
    expand_env_with(value, |name| std::env::var(name).ok())
}

/// Expand environment references with a custom lookup. Unset variables expand to "".
pub fn expand_env_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = ENV_TEMPLATE_REGEX
        .replace_all(value, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned();

    if let Some(name) = expanded.strip_prefix(ENV_PREFIX) {
        return lookup(name).unwrap_or_default();
    }

    let mut parts = expanded.split(ENV_TOKEN);
    let Some(head) = parts.next() else {
        return expanded;
    };
    let mut out = head.to_string();
    for segment in parts {
        let end = segment
            .find(['/', ' ', '\t'])
            .unwrap_or(segment.len());
        let (name, rest) = segment.split_at(end);
        out.push_str(&lookup(name).unwrap_or_default());
        out.push_str(rest);
    }
    out
}
