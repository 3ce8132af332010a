use crate::error::{CompileError, Result};
use serde::Serialize;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// Generated modules and their maps; registries and index files are kept.
fn is_generated(file_name: &str) -> bool {
    let generated = file_name.ends_with(".ts") || file_name.ends_with(".ts.map");
    let preserved = file_name.starts_with("registry.") || file_name.starts_with("index.");
    generated && !preserved
}

/// Removes generated files under `root`, then every directory left empty,
/// deepest first. `root` itself is kept.
pub fn clean_output(root: &Path) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    if !root.is_dir() {
        return Ok(report);
    }

    for entry in WalkDir::new(root).into_iter().filter_map(|entry| entry.ok()) {
        let is_target = entry.file_type().is_file()
            && entry.file_name().to_str().is_some_and(is_generated);
        if is_target {
            std::fs::remove_file(entry.path()).map_err(|source| CompileError::Cleanup {
                path: entry.path().to_path_buf(),
                source,
            })?;
            report.files_removed += 1;
        }
    }

    for entry in WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = std::fs::read_dir(entry.path())
            .map(|mut children| children.next().is_none())
            .unwrap_or(false);
        if is_empty {
            std::fs::remove_dir(entry.path()).map_err(|source| CompileError::Cleanup {
                path: entry.path().to_path_buf(),
                source,
            })?;
            report.dirs_removed += 1;
        }
    }

    tracing::debug!(
        root = %root.display(),
        files = report.files_removed,
        dirs = report.dirs_removed,
        "cleaned output"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_generated() {
        assert!(is_generated("home.ts"));
        assert!(is_generated("home.ts.map"));
        assert!(!is_generated("registry.web.ts"));
        assert!(!is_generated("index.ts"));
        assert!(!is_generated("styles.css"));
    }

    #[test]
    fn test_clean_output_removes_generated_files_and_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("web");
        fs::create_dir_all(root.join("pages/nested")).unwrap();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("pages/nested/deep.ts"), "x").unwrap();
        fs::write(root.join("pages/home.ts"), "x").unwrap();
        fs::write(root.join("pages/home.ts.map"), "{}").unwrap();
        fs::write(root.join("index.ts"), "x").unwrap();
        fs::write(root.join("assets/logo.svg"), "<svg/>").unwrap();

        let report = clean_output(&root).unwrap();
        assert_eq!(report.files_removed, 3);
        assert_eq!(report.dirs_removed, 2);
        assert!(root.exists());
        assert!(root.join("index.ts").exists());
        assert!(root.join("assets/logo.svg").exists());
        assert!(!root.join("pages").exists());
    }

    #[test]
    fn test_missing_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let report = clean_output(&dir.path().join("missing")).unwrap();
        assert_eq!(report, CleanupReport::default());
    }
}
