//! # Oneview
//!
//! Reactive view templates: a directive compiler that turns page templates
//! into host glue plus lazily loadable TypeScript view modules, and a
//! request-scoped runtime that records every rendered view instance for
//! client hydration.
//!
//! ## Features
//!
//! - **`compiler`** (default) - Directive processors, TypeScript emission, build pipeline
//! - **`runtime`** (default) - View state store, render effects, hydration export
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! oneview = "0.6"
//! ```
//!
//! Or only the runtime, for hosts that ship precompiled views:
//!
//! ```toml
//! [dependencies]
//! oneview = { version = "0.6", default-features = false, features = ["runtime"] }
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use oneview::prelude::*;
//!
//! let template = TemplateCompiler::default().compile("counter.blade.php", source);
//!
//! let mut scope = RequestScope::new();
//! let mut render = scope.render("widgets.counter", "c1")?;
//! for directive in &template.directives {
//!     render.apply_directive(&directive.output, &mut evaluate)?;
//! }
//! let hydration = scope.finish();
//! ```

// Re-export the compiler (directives, TypeScript emission, build pipeline)
#[cfg(feature = "compiler")]
pub use oneview_compiler as compiler;

// Re-export the runtime (view state store, hydration)
#[cfg(feature = "runtime")]
pub use oneview_runtime as runtime;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "compiler")]
    pub use oneview_compiler::{
        BuildOptions, BuildPipeline, BuildReport, CompileOptions, CompiledTemplate, ContextSpec,
        DirectiveKind, DirectiveOutput, ModuleCompiler, StoreEffect, TemplateCompiler,
    };

    #[cfg(feature = "runtime")]
    pub use oneview_runtime::{
        AttrTarget, HydrationRecord, PlainData, RenderContext, RequestScope, StoreError,
        ToPlainData, ViewRef, ViewStateStore,
    };
}

#[cfg(all(test, feature = "compiler", feature = "runtime"))]
mod tests {
    use super::prelude::*;
    use serde_json::json;

    #[test]
    fn test_prelude_covers_compile_and_render() {
        let template = TemplateCompiler::default()
            .compile("greeting.blade.php", "@useState(['name' => 'world'])<p>@out($name)</p>");

        let mut scope = RequestScope::new();
        {
            let mut render = scope.render("pages.greeting", "g1").unwrap();
            let mut evaluate = |expression: &str| PlainData::from(json!(expression.trim_matches('\'')));
            for directive in &template.directives {
                render.apply_directive(&directive.output, &mut evaluate).unwrap();
            }
        }

        let instance = scope.store().instance("pages.greeting", "g1").unwrap();
        assert_eq!(instance.states["name"], json!("world"));
        assert_eq!(scope.finish().len(), 1);
    }
}
