//! Output template expansion and lexical path normalization.

use std::path::{Component, Path, PathBuf};

/// Values substituted into an output template.
#[derive(Debug, Clone)]
pub struct OutputValues<'a> {
    pub lang: &'a str,
    /// Source path relative to the directive's glob base
    pub rel_path: &'a Path,
    pub base_name: &'a str,
    /// Extension without the leading dot
    pub ext: &'a str,
}

/// Expand `{lang}`, `{relpath}`, `{basename}` and `{ext}` and normalize the result.
pub fn expand_output(template: &str, values: &OutputValues<'_>) -> PathBuf {
    let expanded = template
        .replace("{lang}", values.lang)
        .replace("{relpath}", &to_slash(values.rel_path))
        .replace("{basename}", values.base_name)
        .replace("{ext}", values.ext);
    clean_path(Path::new(&expanded))
}

/// Split a file name into `(stem, extension)` at the last dot.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => (name, ""),
    }
}

/// Render a path with `/` separators regardless of host convention.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir => Some(String::new()),
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::CurDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically normalize a path: drop `.` segments and fold `..` into preceding segments.
///
/// Leading `..` segments of a relative path are kept. An empty result is returned as an
/// empty path, which joins onto a root as the root itself.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Whether a relative path climbs above its starting directory.
pub fn escapes_root(path: &Path) -> bool {
    path.is_absolute()
        || matches!(
            clean_path(path).components().next(),
            Some(Component::ParentDir)
        )
}
