//! Incremental build of template trees into TypeScript view modules.
//!
//! Per file: discover, filter stale, compile, write, register. Once per
//! context the collected registry is written as `registry.<context>.ts`.
//! Per-file failures are recorded on the report and never abort the batch.

pub mod cleanup;
pub mod discover;
pub mod registry;
pub mod watch;

use crate::canonical_log::CanonicalLog;
use crate::compiler::{CompileOptions, TemplateCompiler};
use crate::error::{CompileError, Result};
use crate::typescript::{write_typescript_to_file, ModuleCompiler, TypeScriptConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

pub use cleanup::{clean_output, CleanupReport};
pub use discover::{discover, plan_artifact, CompiledArtifact, SourceFile};
pub use registry::{emit_registry, registry_path, ViewRegistry};
pub use watch::{WatchState, WatchTick};

pub const DEFAULT_SUFFIX: &str = ".blade.php";

/// A named group of view roots compiled into one output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSpec {
    pub name: String,
    pub views: Vec<PathBuf>,
    pub output: PathBuf,
}

impl ContextSpec {
    pub fn new(name: impl Into<String>, views: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            views,
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Recompile everything and clean stale output first.
    pub force: bool,
    pub suffix: String,
    pub compile: CompileOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            force: false,
            suffix: DEFAULT_SUFFIX.to_string(),
            compile: CompileOptions::default(),
        }
    }
}

impl BuildOptions {
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_compile_options(mut self, compile: CompileOptions) -> Self {
        self.compile = compile;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl From<&CompileError> for FileError {
    fn from(err: &CompileError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextReport {
    pub context: String,
    pub compiled: usize,
    pub skipped: usize,
    pub errors: Vec<FileError>,
    pub registry: Option<PathBuf>,
    pub cleanup: Option<CleanupReport>,
    pub elapsed_ms: u64,
}

impl ContextReport {
    fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub contexts: Vec<ContextReport>,
    pub elapsed_ms: u64,
}

impl BuildReport {
    pub fn compiled(&self) -> usize {
        self.contexts.iter().map(|report| report.compiled).sum()
    }

    pub fn skipped(&self) -> usize {
        self.contexts.iter().map(|report| report.skipped).sum()
    }

    pub fn error_count(&self) -> usize {
        self.contexts.iter().map(|report| report.errors.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }
}

pub struct BuildPipeline {
    contexts: BTreeMap<String, ContextSpec>,
    options: BuildOptions,
    compiler: TemplateCompiler,
}

impl BuildPipeline {
    pub fn new(contexts: impl IntoIterator<Item = ContextSpec>, options: BuildOptions) -> Self {
        Self {
            contexts: contexts
                .into_iter()
                .map(|context| (context.name.clone(), context))
                .collect(),
            compiler: TemplateCompiler::new(options.compile.clone()),
            options,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn context(&self, name: &str) -> Option<&ContextSpec> {
        self.contexts.get(name)
    }

    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    pub fn build_all(&self) -> BuildReport {
        let names: Vec<&str> = self.context_names().collect();
        self.build(&names)
    }

    /// Builds the named contexts in order. Unknown names are reported as a
    /// context-level error and the batch continues.
    pub fn build(&self, names: &[&str]) -> BuildReport {
        let start = Instant::now();
        let contexts = names
            .iter()
            .map(|name| match self.context(name) {
                Some(context) => self.build_context(context),
                None => {
                    tracing::warn!(context = %name, "context not configured");
                    let mut report = ContextReport::new(name);
                    report.errors.push(FileError {
                        path: PathBuf::new(),
                        message: format!("context '{name}' is not configured"),
                    });
                    report
                }
            })
            .collect();

        BuildReport {
            contexts,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    pub fn build_context(&self, context: &ContextSpec) -> ContextReport {
        let span = tracing::info_span!("build_context", context = %context.name);
        let _guard = span.enter();
        let start = Instant::now();
        let mut report = ContextReport::new(&context.name);

        if self.options.force {
            match clean_output(&context.output) {
                Ok(cleanup) => report.cleanup = Some(cleanup),
                Err(err) => {
                    tracing::warn!(path = %err.path().display(), error = %err, "cleanup failed");
                    report.errors.push(FileError::from(&err));
                }
            }
        }

        let mut registry = ViewRegistry::new();
        for file in discover(context, &self.options.suffix) {
            let artifact = match plan_artifact(context, &file, &self.options.suffix) {
                Ok(artifact) => artifact,
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), error = %err, "cannot place view");
                    report.errors.push(FileError::from(&err));
                    continue;
                }
            };

            if !self.options.force && !is_stale(&artifact.source_path, &artifact.output_path) {
                tracing::debug!(view = %artifact.symbolic_name, "up to date");
                report.skipped += 1;
                registry.register(&artifact);
                continue;
            }

            match self.compile_artifact(&context.name, &artifact) {
                Ok(()) => {
                    report.compiled += 1;
                    registry.register(&artifact);
                }
                Err(err) => {
                    tracing::warn!(path = %err.path().display(), error = %err, "failed to compile view");
                    report.errors.push(FileError::from(&err));
                }
            }
        }

        match emit_registry(context, &registry) {
            Ok(path) => report.registry = path,
            Err(err) => {
                tracing::warn!(path = %err.path().display(), error = %err, "failed to write registry");
                report.errors.push(FileError::from(&err));
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            compiled = report.compiled,
            skipped = report.skipped,
            errors = report.errors.len(),
            elapsed_ms = report.elapsed_ms,
            "context built"
        );
        report
    }

    /// Compiles one source to its planned output (and `.map` when enabled).
    pub fn compile_artifact(&self, context: &str, artifact: &CompiledArtifact) -> Result<()> {
        let mut log = CanonicalLog::new(&artifact.symbolic_name);
        log.set("context", context)
            .set("source", artifact.source_path.display().to_string());

        let bytes = std::fs::read(&artifact.source_path).map_err(|source| CompileError::Read {
            path: artifact.source_path.clone(),
            source,
        })?;
        let source = String::from_utf8(bytes).map_err(|_| CompileError::NonUtf8 {
            path: artifact.source_path.clone(),
        })?;

        let source_name = artifact
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let template = self.compiler.compile(&source_name, &source);
        for diagnostic in &template.diagnostics {
            tracing::warn!(path = %artifact.source_path.display(), "{diagnostic}");
        }
        log.record_template(&template);

        let config = TypeScriptConfig::default().with_minify(self.options.compile.minify);
        let output = ModuleCompiler::new(&artifact.symbolic_name, &template)
            .with_config(config)
            .compile();
        write_typescript_to_file(&output, &artifact.output_path).map_err(|source| {
            CompileError::Write {
                path: artifact.output_path.clone(),
                source,
            }
        })?;

        if let Some(map) = &template.position_map {
            let map_path = artifact.map_path();
            std::fs::write(&map_path, map.to_json())
                .map_err(|source| CompileError::Write { path: map_path, source })?;
        }

        log.set("bytes_in", source.len())
            .set("bytes_out", template.template.len());
        Ok(())
    }
}

/// A source needs compiling unless its output exists and is at least as new.
pub fn is_stale(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
    };
    match (modified(source), modified(output)) {
        (Some(source_time), Some(output_time)) => output_time < source_time,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.blade.php");
        fs::write(&source, "x").unwrap();
        assert!(is_stale(&source, &dir.path().join("a.ts")));
    }

    #[test]
    fn test_newer_output_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.blade.php");
        let output = dir.path().join("a.ts");
        fs::write(&source, "x").unwrap();
        fs::write(&output, "y").unwrap();
        let older = SystemTime::now() - std::time::Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(older)
            .unwrap();
        assert!(!is_stale(&source, &output));
    }

    #[test]
    fn test_unknown_context_is_reported() {
        let pipeline = BuildPipeline::new(Vec::new(), BuildOptions::default());
        let report = pipeline.build(&["nope"]);
        assert_eq!(report.contexts.len(), 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.contexts[0].errors[0].message.contains("nope"));
    }
}
