//! # oneview-compiler
//!
//! Template directive compiler and incremental view build pipeline for Oneview.
//!
//! This crate turns page templates containing reactive directives into host
//! template glue plus lazily loadable TypeScript view modules:
//!
//! - **Expression Toolkit** - quote and bracket aware scanning of directive arguments
//! - **Directive Processors** - `@let`, `@const`, `@useState`, `@exec`, `@out`, `@attr`
//! - **Template Compiler** - finds directive occurrences and splices in their glue
//! - **TypeScript Generation** - per-view modules and per-context registries
//! - **Build Pipeline** - discovery, staleness checks, cleanup and watch mode
//!   (`pipeline` feature, on by default)
//!
//! ## Example
//!
//! ```rust,ignore
//! use oneview_compiler::{BuildOptions, BuildPipeline, ContextSpec};
//!
//! let web = ContextSpec::new("web", vec!["resources/views/web".into()], "resources/ts/views/web");
//! let pipeline = BuildPipeline::new([web], BuildOptions::default());
//! let report = pipeline.build_all();
//! println!("compiled {} views", report.compiled());
//! ```

pub mod canonical_log;
pub mod compiler;
pub mod directives;
pub mod error;
pub mod expr;
#[cfg(feature = "pipeline")]
pub mod pipeline;
pub mod typescript;

pub use compiler::{
    CompileOptions, CompiledDirective, CompiledTemplate, Diagnostic, PositionMap, Severity,
    TemplateCompiler,
};
pub use directives::{
    AttributeConfig, CodeFences, DirectiveKind, DirectiveOutput, DirectiveProcessor, Fragment,
    RenderThunk, StoreEffect,
};
pub use error::CompileError;
pub use expr::DependencySet;
#[cfg(feature = "pipeline")]
pub use pipeline::{
    BuildOptions, BuildPipeline, BuildReport, CompiledArtifact, ContextReport, ContextSpec,
    FileError, ViewRegistry, WatchState, WatchTick,
};
pub use typescript::{write_typescript_to_file, ModuleCompiler, TypeScriptConfig};
#[cfg(feature = "pipeline")]
pub use typescript::RegistryGenerator;
