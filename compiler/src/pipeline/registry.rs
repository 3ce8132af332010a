//! Per-context view registry: symbolic name -> import path, grouped by source tag.

use super::discover::{views_base, CompiledArtifact, SHARED_ROOT_PREFIX};
use super::ContextSpec;
use crate::error::{CompileError, Result};
use crate::typescript::RegistryGenerator;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewRegistry {
    groups: BTreeMap<String, BTreeMap<String, String>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        source_tag: impl Into<String>,
        name: impl Into<String>,
        import_path: impl Into<String>,
    ) {
        self.groups
            .entry(source_tag.into())
            .or_default()
            .insert(name.into(), import_path.into());
    }

    pub fn register(&mut self, artifact: &CompiledArtifact) {
        self.insert(
            artifact.source_tag.clone(),
            artifact.symbolic_name.clone(),
            artifact.import_path.clone(),
        );
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, String>)> {
        self.groups.iter()
    }

    pub fn group(&self, source_tag: &str) -> Option<&BTreeMap<String, String>> {
        self.groups.get(source_tag)
    }

    /// Number of distinct view names across all groups.
    pub fn len(&self) -> usize {
        let mut names: Vec<&String> = self.groups.values().flat_map(|group| group.keys()).collect();
        names.sort();
        names.dedup();
        names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(BTreeMap::is_empty)
    }

    /// The registry a context publishes: its own group plus every shared
    /// group, or only its own group when the context is itself shared.
    pub fn for_context(&self, context: &str) -> ViewRegistry {
        let context_is_shared = context.starts_with(SHARED_ROOT_PREFIX);
        let groups = self
            .groups
            .iter()
            .filter(|(tag, _)| {
                tag.as_str() == context || (!context_is_shared && tag.starts_with(SHARED_ROOT_PREFIX))
            })
            .map(|(tag, group)| (tag.clone(), group.clone()))
            .collect();
        ViewRegistry { groups }
    }
}

pub fn registry_path(context: &ContextSpec) -> PathBuf {
    views_base(&context.output).join(format!("registry.{}.ts", context.name))
}

/// Writes `registry.<context>.ts`. Returns `None` without writing when the
/// registry is empty.
pub fn emit_registry(context: &ContextSpec, registry: &ViewRegistry) -> Result<Option<PathBuf>> {
    let registry = registry.for_context(&context.name);
    if registry.is_empty() {
        tracing::debug!(context = %context.name, "registry empty, skipping");
        return Ok(None);
    }

    let path = registry_path(context);
    let contents = RegistryGenerator::new(&context.name, &registry).generate();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CompileError::Write {
            path: path.clone(),
            source,
        })?;
    }
    std::fs::write(&path, contents).map_err(|source| CompileError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(context = %context.name, path = %path.display(), views = registry.len(), "registry written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_context_merges_shared_groups() {
        let mut registry = ViewRegistry::new();
        registry.insert("web", "pages.home", "web/pages/home");
        registry.insert("admin", "dashboard", "admin/dashboard");
        registry.insert("_system", "errors.404", "_system/errors/404");

        let web = registry.for_context("web");
        let tags: Vec<&String> = web.groups().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["_system", "web"]);
        assert_eq!(web.len(), 2);

        let system = registry.for_context("_system");
        assert_eq!(system.groups().count(), 1);
    }

    #[test]
    fn test_empty_registry_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let context = ContextSpec::new("web", vec![], dir.path().join("web"));
        let written = emit_registry(&context, &ViewRegistry::new()).unwrap();
        assert!(written.is_none());
        assert!(!registry_path(&context).exists());
    }
}
