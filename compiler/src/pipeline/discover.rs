//! Source discovery and output path planning.

use super::ContextSpec;
use crate::error::{CompileError, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directory-name prefix marking a view root shared across contexts.
pub const SHARED_ROOT_PREFIX: char = '_';

/// A template found under one of a context's view roots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub root: PathBuf,
    /// Registry group: the shared root's directory name, or the context name.
    pub source_tag: String,
    pub shared: bool,
}

/// Where a source compiles to and how the registry refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledArtifact {
    pub source_path: PathBuf,
    pub source_tag: String,
    pub output_path: PathBuf,
    pub symbolic_name: String,
    pub import_path: String,
}

impl CompiledArtifact {
    pub fn map_path(&self) -> PathBuf {
        let mut path = self.output_path.clone().into_os_string();
        path.push(".map");
        PathBuf::from(path)
    }
}

pub fn is_shared_root(root: &Path) -> bool {
    root.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SHARED_ROOT_PREFIX))
}

/// Every file ending in `suffix` under the context's view roots, sorted.
/// Missing roots are skipped with a warning.
pub fn discover(context: &ContextSpec, suffix: &str) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for root in &context.views {
        if !root.is_dir() {
            tracing::warn!(context = %context.name, root = %root.display(), "view root does not exist");
            continue;
        }

        let shared = is_shared_root(root);
        let source_tag = if shared {
            root.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string()
        } else {
            context.name.clone()
        };

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let matches_suffix = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(suffix) && name.len() > suffix.len());
            if entry.file_type().is_file() && matches_suffix {
                files.push(SourceFile {
                    path: entry.into_path(),
                    root: root.clone(),
                    source_tag: source_tag.clone(),
                    shared,
                });
            }
        }
    }

    files.sort();
    files.dedup_by(|a, b| a.path == b.path);
    files
}

/// Base directory holding every context's output plus the registries.
pub fn views_base(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Output location, symbolic name and import path of a source file.
pub fn plan_artifact(
    context: &ContextSpec,
    file: &SourceFile,
    suffix: &str,
) -> Result<CompiledArtifact> {
    let relative = file
        .path
        .strip_prefix(&file.root)
        .map_err(|_| CompileError::OutsideRoot {
            path: file.path.clone(),
            root: file.root.clone(),
        })?;

    let segments = path_segments(relative);
    let Some((file_name, dirs)) = segments.split_last() else {
        return Err(CompileError::OutsideRoot {
            path: file.path.clone(),
            root: file.root.clone(),
        });
    };
    let stem = file_name.strip_suffix(suffix).unwrap_or(file_name);

    let base = views_base(&context.output);
    let output_root = if file.shared {
        base.join(&file.source_tag)
    } else {
        context.output.clone()
    };

    let mut output_path = output_root;
    for dir in dirs {
        output_path.push(dir);
    }
    output_path.push(format!("{stem}.ts"));

    let mut name_parts: Vec<&str> = dirs.iter().map(String::as_str).collect();
    name_parts.push(stem);

    let import_path = output_path
        .strip_prefix(&base)
        .map(|path| {
            let mut segments = path_segments(path);
            if let Some(last) = segments.last_mut() {
                if let Some(trimmed) = last.strip_suffix(".ts") {
                    *last = trimmed.to_string();
                }
            }
            segments.join("/")
        })
        .unwrap_or_else(|_| name_parts.join("/"));

    Ok(CompiledArtifact {
        source_path: file.path.clone(),
        source_tag: file.source_tag.clone(),
        symbolic_name: name_parts.join("."),
        output_path,
        import_path,
    })
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ContextSpec {
        ContextSpec::new(
            "web",
            vec![PathBuf::from("views/web"), PathBuf::from("views/_system")],
            "out/views/web",
        )
    }

    #[test]
    fn test_context_artifact() {
        let file = SourceFile {
            path: PathBuf::from("views/web/pages/home.blade.php"),
            root: PathBuf::from("views/web"),
            source_tag: "web".to_string(),
            shared: false,
        };
        let artifact = plan_artifact(&context(), &file, ".blade.php").unwrap();
        assert_eq!(artifact.output_path, PathBuf::from("out/views/web/pages/home.ts"));
        assert_eq!(artifact.symbolic_name, "pages.home");
        assert_eq!(artifact.import_path, "web/pages/home");
        assert_eq!(
            artifact.map_path(),
            PathBuf::from("out/views/web/pages/home.ts.map")
        );
    }

    #[test]
    fn test_shared_artifact_lands_beside_context_output() {
        let file = SourceFile {
            path: PathBuf::from("views/_system/errors/404.blade.php"),
            root: PathBuf::from("views/_system"),
            source_tag: "_system".to_string(),
            shared: true,
        };
        let artifact = plan_artifact(&context(), &file, ".blade.php").unwrap();
        assert_eq!(
            artifact.output_path,
            PathBuf::from("out/views/_system/errors/404.ts")
        );
        assert_eq!(artifact.symbolic_name, "errors.404");
        assert_eq!(artifact.import_path, "_system/errors/404");
    }

    #[test]
    fn test_file_outside_root() {
        let file = SourceFile {
            path: PathBuf::from("elsewhere/x.blade.php"),
            root: PathBuf::from("views/web"),
            source_tag: "web".to_string(),
            shared: false,
        };
        assert!(matches!(
            plan_artifact(&context(), &file, ".blade.php"),
            Err(CompileError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_shared_root_detection() {
        assert!(is_shared_root(Path::new("resources/views/_system")));
        assert!(!is_shared_root(Path::new("resources/views/web")));
        assert_eq!(views_base(Path::new("web")), PathBuf::from("."));
    }
}
