//! Plan resolution.
//!
//! Discovers every descriptor under the project root, resolves overlapping directives
//! to one winner per source file and computes everything needed to translate it:
//! inherited context, per-language context, role settings and output paths.
//!
//! Resolution is a pure function of the filesystem. Two calls on an unchanged tree
//! produce identical plans.

pub mod format;
pub mod output;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::descriptor::llm::{merge_llm, resolve_agents};
use crate::descriptor::{
    AgentConfig, DESCRIPTOR_FILE, DescriptorFile, Directive, LlmConfig, read_lang_context,
};
use crate::errors::PlanError;
pub use format::Format;
use output::{OutputValues, clean_path, escapes_root, expand_output, split_file_name, to_slash};

/// Directories never scanned for descriptors.
const SKIPPED_DIRS: [&str; 2] = [".git", ".l10n"];

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolved translation work for a project.
#[derive(Debug, Clone)]
pub struct Plan {
    pub root: PathBuf,
    /// Every descriptor found, shallowest first
    pub descriptors: Vec<DescriptorFile>,
    /// One entry per source file, sorted by source path
    pub sources: Vec<SourcePlan>,
}

/// Resolved backend roles for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPlan {
    pub coordinator: AgentConfig,
    pub translator: AgentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub lang: String,
    /// Output path relative to the project root
    pub output_path: PathBuf,
}

/// The resolved translation unit for one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlan {
    /// Path relative to the project root
    pub source_path: PathBuf,
    pub abs_path: PathBuf,
    /// Literal directory prefix of the winning glob, relative to the root
    pub base_path: PathBuf,
    /// `source_path` relative to `base_path`
    pub rel_path: PathBuf,
    pub format: Format,
    pub directive: Directive,
    /// Non-empty ancestor descriptor bodies, root first
    pub context_bodies: Vec<String>,
    /// Per-language context bodies, root first
    pub lang_context_bodies: BTreeMap<String, Vec<String>>,
    /// Descriptors contributing to `context_bodies`
    pub context_paths: Vec<PathBuf>,
    pub llm: LlmPlan,
    pub outputs: Vec<OutputPlan>,
}

impl SourcePlan {
    /// General context followed by the language's additional context.
    pub fn context_parts_for(&self, lang: &str) -> Vec<&str> {
        let mut parts: Vec<&str> = self.context_bodies.iter().map(String::as_str).collect();
        if let Some(lang_parts) = self.lang_context_bodies.get(lang) {
            parts.extend(lang_parts.iter().map(String::as_str));
        }
        parts
    }

    pub fn context_string_for(&self, lang: &str) -> String {
        self.context_parts_for(lang).join("\n\n")
    }

    /// Slash-separated source path, used as the lock key.
    pub fn source_key(&self) -> String {
        to_slash(&self.source_path)
    }
}

struct Candidate<'a> {
    directive: &'a Directive,
    base_path: PathBuf,
}

impl Plan {
    /// Resolve the plan for the project rooted at `root`.
    pub fn build(root: &Path) -> Result<Self, PlanError> {
        let root = std::path::absolute(root).map_err(|source| PlanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let descriptors = discover_descriptors(&root)?;
        debug!(count = descriptors.len(), "Discovered descriptors");

        let directives: Vec<&Directive> = descriptors
            .iter()
            .flat_map(|file| file.directives.iter())
            .collect();
        let candidates = resolve_directives(&root, &directives)?;

        let mut sources = Vec::with_capacity(candidates.len());
        for (source_path, candidate) in candidates {
            sources.push(build_source_plan(&root, &descriptors, source_path, candidate)?);
        }
        check_output_collisions(&sources)?;

        Ok(Self {
            root,
            descriptors,
            sources,
        })
    }

    /// Descriptor defining the winning directive of `source`.
    pub fn descriptor_for(&self, source: &SourcePlan) -> Option<&DescriptorFile> {
        self.descriptors
            .iter()
            .find(|file| file.origin.path == source.directive.origin.path)
    }
}

fn discover_descriptors(root: &Path) -> Result<Vec<DescriptorFile>, PlanError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && SKIPPED_DIRS.iter().any(|skip| entry.file_name() == *skip))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE {
            continue;
        }
        let depth = entry
            .path()
            .parent()
            .and_then(|dir| dir.strip_prefix(root).ok())
            .map(|rel| rel.components().count())
            .unwrap_or(0);
        files.push(DescriptorFile::load(entry.path(), depth)?);
    }

    // Stable sort keeps walk order among descriptors of equal depth
    files.sort_by_key(|file| file.origin.depth);
    Ok(files)
}

/// Origin directory of a directive relative to the root.
fn origin_rel_dir(root: &Path, directive: &Directive) -> PathBuf {
    directive
        .origin
        .dir
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Directory part of the pattern's literal prefix before the first wildcard.
fn glob_base(pattern: &str) -> &str {
    let literal = match pattern.find(['*', '?', '[']) {
        Some(idx) => &pattern[..idx],
        None => pattern,
    };
    match literal.rfind('/') {
        Some(idx) => &literal[..idx],
        None => "",
    }
}

/// Root-relative, slash-separated pattern for a directive-relative glob.
fn rooted_pattern(root: &Path, directive: &Directive, pattern: &str) -> Result<String, PlanError> {
    let joined = clean_path(&origin_rel_dir(root, directive).join(pattern));
    if escapes_root(&joined) {
        return Err(PlanError::Glob {
            pattern: pattern.to_string(),
            message: "pattern escapes the project root".to_string(),
        });
    }
    Ok(to_slash(&joined))
}

fn resolve_directives<'a>(
    root: &Path,
    directives: &[&'a Directive],
) -> Result<BTreeMap<PathBuf, Candidate<'a>>, PlanError> {
    let mut candidates: BTreeMap<PathBuf, Candidate<'a>> = BTreeMap::new();
    let escaped_root = Pattern::escape(&root.to_string_lossy());

    for &directive in directives {
        let pattern = rooted_pattern(root, directive, &directive.source)?;
        let base_path = PathBuf::from(glob_base(&pattern));

        let excludes = directive
            .exclude
            .iter()
            .map(|exclude| {
                let rooted = rooted_pattern(root, directive, exclude)?;
                Pattern::new(&rooted).map_err(|e| PlanError::Glob {
                    pattern: rooted.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let full_pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        let matches = glob::glob_with(&full_pattern, GLOB_OPTIONS).map_err(|e| PlanError::Glob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in matches {
            let path = entry.map_err(|e| PlanError::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_dir() || path.file_name().is_some_and(|name| name == DESCRIPTOR_FILE) {
                continue;
            }
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_slash = to_slash(rel);
            if excludes
                .iter()
                .any(|exclude| exclude.matches_with(&rel_slash, GLOB_OPTIONS))
            {
                continue;
            }

            let replace = candidates
                .get(rel)
                .is_none_or(|existing| directive.precedence() > existing.directive.precedence());
            if replace {
                candidates.insert(
                    rel.to_path_buf(),
                    Candidate {
                        directive,
                        base_path: base_path.clone(),
                    },
                );
            }
        }
    }

    Ok(candidates)
}

/// Every (source, language) pair must own its output file.
fn check_output_collisions(sources: &[SourcePlan]) -> Result<(), PlanError> {
    let mut owners: BTreeMap<&Path, (&SourcePlan, &str)> = BTreeMap::new();
    for source in sources {
        for output in &source.outputs {
            if let Some((first, first_lang)) =
                owners.insert(output.output_path.as_path(), (source, &output.lang))
            {
                return Err(PlanError::OutputCollision {
                    output: to_slash(&output.output_path),
                    first: format!("{} ({})", first.source_key(), first_lang),
                    second: format!("{} ({})", source.source_key(), output.lang),
                });
            }
        }
    }
    Ok(())
}

fn build_source_plan(
    root: &Path,
    descriptors: &[DescriptorFile],
    source_path: PathBuf,
    candidate: Candidate<'_>,
) -> Result<SourcePlan, PlanError> {
    let abs_path = root.join(&source_path);
    let directive = candidate.directive;

    let ancestors: Vec<&DescriptorFile> = descriptors
        .iter()
        .filter(|file| abs_path.starts_with(&file.origin.dir))
        .collect();

    let mut context_bodies = Vec::new();
    let mut context_paths = Vec::new();
    let mut lang_context_bodies: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut llm = LlmConfig::default();

    for file in &ancestors {
        if file.has_body() {
            context_bodies.push(file.body.clone());
            context_paths.push(file.origin.path.clone());
        }
        for lang in &directive.targets {
            if let Some(body) = read_lang_context(&file.origin.dir, lang)?
                && !body.trim().is_empty()
            {
                lang_context_bodies
                    .entry(lang.clone())
                    .or_default()
                    .push(body);
            }
        }
        llm = merge_llm(&llm, &file.llm);
    }

    let (coordinator, translator) = resolve_agents(&llm)?;

    let rel_path = source_path
        .strip_prefix(&candidate.base_path)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source_path.clone());
    let file_name = source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (base_name, ext) = split_file_name(&file_name);

    let outputs = directive
        .targets
        .iter()
        .map(|lang| OutputPlan {
            lang: lang.clone(),
            output_path: expand_output(
                &directive.output,
                &OutputValues {
                    lang,
                    rel_path: &rel_path,
                    base_name,
                    ext,
                },
            ),
        })
        .collect();

    debug!(
        source = %source_path.display(),
        origin = %directive.origin.path.display(),
        ancestors = ancestors.len(),
        "Resolved source"
    );

    Ok(SourcePlan {
        format: Format::detect(&file_name),
        abs_path,
        base_path: candidate.base_path,
        rel_path,
        directive: directive.clone(),
        context_bodies,
        lang_context_bodies,
        context_paths,
        llm: LlmPlan {
            coordinator,
            translator,
        },
        outputs,
        source_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LANG_CONTEXT_DIR;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_deeper_descriptor_wins() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"docs/*.md\"\ntargets = [\"es\", \"de\"]\noutput = \"out/{lang}/{relpath}\"\n+++\nRoot context\n",
        );
        write(
            root,
            "docs/L10N.md",
            "+++\n[[translate]]\nsource = \"guide.md\"\ntargets = [\"es\", \"de\"]\noutput = \"out/deep/{lang}/{relpath}\"\n+++\nNested context\n",
        );
        write(root, "docs/guide.md", "Hello");

        let plan = Plan::build(root).unwrap();
        assert_eq!(plan.sources.len(), 1);
        let source = &plan.sources[0];
        assert_eq!(source.source_path, PathBuf::from("docs/guide.md"));
        assert_eq!(source.outputs[0].lang, "es");
        assert_eq!(
            source.outputs[0].output_path,
            PathBuf::from("out/deep/es/guide.md")
        );
        assert_eq!(source.context_bodies.len(), 2);
        assert_eq!(source.context_bodies[0].trim(), "Root context");
        assert_eq!(source.context_bodies[1].trim(), "Nested context");
    }

    #[test]
    fn test_later_declaration_wins_at_same_depth() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            r#"+++
[[translate]]
source = "docs/guide.md"
targets = ["es"]
output = "out/first/{lang}/{relpath}"

[[translate]]
source = "docs/guide.md"
targets = ["es"]
output = "out/second/{lang}/{relpath}"
+++
"#,
        );
        write(root, "docs/guide.md", "Hello");

        let plan = Plan::build(root).unwrap();
        assert_eq!(
            plan.sources[0].outputs[0].output_path,
            PathBuf::from("out/second/es/guide.md")
        );
        assert_eq!(plan.sources[0].directive.index, 1);
    }

    #[test]
    fn test_language_context_is_additive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"docs/guide.md\"\ntargets = [\"es\", \"de\"]\noutput = \"out/{lang}/{relpath}\"\n+++\nRoot context\n",
        );
        write(root, &format!("{LANG_CONTEXT_DIR}/es.md"), "Contexto español");
        write(root, "docs/guide.md", "Hello");

        let plan = Plan::build(root).unwrap();
        let source = &plan.sources[0];
        let es = source.context_parts_for("es");
        assert_eq!(es.len(), 2);
        assert_eq!(es[0].trim(), "Root context");
        assert_eq!(es[1].trim(), "Contexto español");

        let de = source.context_parts_for("de");
        assert_eq!(de.len(), 1);
        assert_eq!(source.context_string_for("es"), es.join("\n\n"));
    }

    #[test]
    fn test_new_language_does_not_change_general_context() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let descriptor = |targets: &str| {
            format!(
                "+++\n[[translate]]\nsource = \"guide.md\"\ntargets = [{targets}]\noutput = \"out/{{lang}}/{{relpath}}\"\n+++\nRoot context\n"
            )
        };
        write(root, "L10N.md", &descriptor("\"es\""));
        write(root, "guide.md", "Hello");
        let before = Plan::build(root).unwrap();

        write(root, "L10N.md", &descriptor("\"es\", \"fr\""));
        write(root, &format!("{LANG_CONTEXT_DIR}/fr.md"), "Vouvoiement");
        let after = Plan::build(root).unwrap();

        assert_eq!(
            before.sources[0].context_parts_for("es"),
            after.sources[0].context_parts_for("es")
        );
        assert_eq!(after.sources[0].outputs.len(), 2);
    }

    #[test]
    fn test_excludes_directories_and_descriptors_are_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            r#"+++
[[translate]]
source = "docs/**/*.md"
targets = ["es"]
output = "out/{lang}/{relpath}"
exclude = ["docs/drafts/*.md"]
+++
"#,
        );
        write(root, "docs/guide.md", "Hello");
        write(root, "docs/nested/deep.md", "Deep");
        write(root, "docs/drafts/wip.md", "Draft");
        write(root, "docs/L10N.md", "Docs context\n");
        std::fs::create_dir_all(root.join("docs/folder.md")).unwrap();

        let plan = Plan::build(root).unwrap();
        let sources: Vec<String> = plan.sources.iter().map(SourcePlan::source_key).collect();
        assert_eq!(sources, vec!["docs/guide.md", "docs/nested/deep.md"]);

        let deep = &plan.sources[1];
        assert_eq!(deep.base_path, PathBuf::from("docs"));
        assert_eq!(deep.rel_path, PathBuf::from("nested/deep.md"));
        assert_eq!(
            deep.outputs[0].output_path,
            PathBuf::from("out/es/nested/deep.md")
        );
        assert_eq!(deep.context_bodies, vec!["Docs context\n".to_string()]);
    }

    #[test]
    fn test_literal_source_uses_origin_dir_as_base() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "docs/L10N.md",
            "+++\n[[translate]]\nsource = \"guide.md\"\ntargets = [\"es\"]\noutput = \"{basename}.{lang}.{ext}\"\n+++\n",
        );
        write(root, "docs/guide.md", "Hello");

        let plan = Plan::build(root).unwrap();
        let source = &plan.sources[0];
        assert_eq!(source.base_path, PathBuf::from("docs"));
        assert_eq!(source.rel_path, PathBuf::from("guide.md"));
        assert_eq!(source.outputs[0].output_path, PathBuf::from("guide.es.md"));
        assert!(source.context_bodies.is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent_and_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"*.json\"\ntargets = [\"es\"]\noutput = \"out/{lang}/{relpath}\"\n+++\nCtx\n",
        );
        write(root, "b.json", "{}");
        write(root, "a.json", "{}");

        let first = Plan::build(root).unwrap();
        let second = Plan::build(root).unwrap();
        assert_eq!(first.sources, second.sources);
        assert_eq!(first.sources[0].source_key(), "a.json");
        assert_eq!(first.sources[0].format, Format::Json);
    }

    #[test]
    fn test_llm_settings_layer_through_ancestors() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[llm]\nprovider = \"anthropic\"\ntranslator_model = \"root-model\"\n+++\n",
        );
        write(
            root,
            "docs/L10N.md",
            "+++\n[llm]\ntranslator_model = \"docs-model\"\n\n[[translate]]\nsource = \"*.md\"\ntargets = [\"es\"]\noutput = \"out/{lang}/{relpath}\"\n+++\n",
        );
        write(root, "docs/guide.md", "Hello");

        let plan = Plan::build(root).unwrap();
        let llm = &plan.sources[0].llm;
        assert_eq!(llm.translator.provider(), "anthropic");
        assert_eq!(llm.translator.model(), Some("docs-model"));
        assert_eq!(llm.translator.base_url(), Some("https://api.anthropic.com"));
    }

    #[test]
    fn test_unknown_role_aborts_resolution() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[llm.agent]]\nrole = \"reviewer\"\n\n[[translate]]\nsource = \"a.md\"\ntargets = [\"es\"]\noutput = \"out/{lang}.md\"\n+++\n",
        );
        write(root, "a.md", "Hello");

        let err = Plan::build(root).unwrap_err();
        assert!(err.to_string().contains("reviewer"));
    }

    #[test]
    fn test_pattern_escaping_root_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"../*.md\"\ntargets = [\"es\"]\noutput = \"out/{lang}.md\"\n+++\n",
        );
        assert!(matches!(
            Plan::build(root).unwrap_err(),
            PlanError::Glob { .. }
        ));
    }

    #[test]
    fn test_shared_output_path_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"docs/*.md\"\ntargets = [\"es\"]\noutput = \"out/{lang}.md\"\n+++\n",
        );
        write(root, "docs/a.md", "A");
        write(root, "docs/b.md", "B");

        match Plan::build(root).unwrap_err() {
            PlanError::OutputCollision {
                output,
                first,
                second,
            } => {
                assert_eq!(output, "out/es.md");
                assert_eq!(first, "docs/a.md (es)");
                assert_eq!(second, "docs/b.md (es)");
            }
            other => panic!("Expected OutputCollision, got {other:?}"),
        }
    }

    #[test]
    fn test_languages_sharing_one_output_are_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "L10N.md",
            "+++\n[[translate]]\nsource = \"a.md\"\ntargets = [\"es\", \"de\"]\noutput = \"out/{relpath}\"\n+++\n",
        );
        write(root, "a.md", "A");

        let err = Plan::build(root).unwrap_err();
        assert!(matches!(err, PlanError::OutputCollision { .. }));
        assert!(err.to_string().contains("out/a.md"));
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("docs/**/*.md"), "docs");
        assert_eq!(glob_base("docs/guide.md"), "docs");
        assert_eq!(glob_base("guide.md"), "");
        assert_eq!(glob_base("*.md"), "");
        assert_eq!(glob_base("docs/gu*.md"), "docs");
    }
}
