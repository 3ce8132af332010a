//! Directive processors.
//!
//! Each processor consumes the raw argument text of one directive occurrence
//! and returns host-template glue plus dependency metadata. Processors never
//! fail: malformed input degrades to an inert comment fragment.
//!
//! The glue addresses the render context through fixed host names
//! ([`HELPER`], [`VIEW_PATH`], [`VIEW_ID`], [`OUTPUT_TASK_ID`]) that the host
//! template engine binds before the compiled template runs. The store writes
//! the glue performs are also described as data in [`StoreEffect`] so a Rust
//! host can apply them without evaluating glue code.

pub mod attribute;
pub mod declaration;
pub mod output;

use crate::expr::DependencySet;
use serde::{Deserialize, Serialize};

pub use attribute::{
    is_reserved_attribute_key, AttributeConfig, AttributeProcessor, RenderThunk,
    RESERVED_ATTRIBUTE_KEYS,
};
pub use declaration::{DeclarationProcessor, StatementProcessor, UseStateProcessor};
pub use output::{OutputProcessor, OUTPUT_BEGIN_MARKER, OUTPUT_END_MARKER};

/// Host variable holding the view state store.
pub const HELPER: &str = "$__helper";
/// Host variable holding the symbolic name of the view being rendered.
pub const VIEW_PATH: &str = "$__VIEW_PATH__";
/// Host variable holding the id of the view instance being rendered.
pub const VIEW_ID: &str = "$__VIEW_ID__";
/// Host variable holding the task id of the output component being emitted.
pub const OUTPUT_TASK_ID: &str = "$__OC_TASK_ID__";

/// Delimiters that switch the host template from markup into code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFences {
    pub open: String,
    pub close: String,
}

impl Default for CodeFences {
    fn default() -> Self {
        Self {
            open: "<?php ".to_string(),
            close: " ?>".to_string(),
        }
    }
}

impl CodeFences {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DirectiveKind {
    Let,
    Const,
    UseState,
    Exec,
    Out,
    Attr,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 6] = [
        DirectiveKind::Let,
        DirectiveKind::Const,
        DirectiveKind::UseState,
        DirectiveKind::Exec,
        DirectiveKind::Out,
        DirectiveKind::Attr,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "let" => Some(DirectiveKind::Let),
            "const" => Some(DirectiveKind::Const),
            "useState" => Some(DirectiveKind::UseState),
            "exec" => Some(DirectiveKind::Exec),
            "out" | "Out" => Some(DirectiveKind::Out),
            "attr" | "Attr" => Some(DirectiveKind::Attr),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Let => "let",
            DirectiveKind::Const => "const",
            DirectiveKind::UseState => "useState",
            DirectiveKind::Exec => "exec",
            DirectiveKind::Out => "out",
            DirectiveKind::Attr => "attr",
        }
    }

    pub fn process(self, expression: &str) -> DirectiveOutput {
        match self {
            DirectiveKind::Let | DirectiveKind::Const => DeclarationProcessor.process(expression),
            DirectiveKind::UseState => UseStateProcessor.process(expression),
            DirectiveKind::Exec => StatementProcessor.process(expression),
            DirectiveKind::Out => OutputProcessor.process(expression),
            DirectiveKind::Attr => AttributeProcessor.process(expression),
        }
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub trait DirectiveProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput;
}

/// One piece of compiled directive output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "camelCase")]
pub enum Fragment {
    /// Host statements, emitted between code fences
    Code(String),
    /// Host expression whose value is printed
    Echo(String),
    /// Literal markup, emitted as is
    Markup(String),
}

/// Store write the glue performs at render time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum StoreEffect {
    /// Record the value of `value_expr` under the state `key`
    SetState { key: String, value_expr: String },
    /// Register a refreshable output region with a fresh task id
    RegisterOutput { dependencies: DependencySet },
    /// Register a reactive tag attribute binding
    RegisterAttribute { config: AttributeConfig },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveOutput {
    pub fragments: Vec<Fragment>,
    pub dependencies: DependencySet,
    pub effects: Vec<StoreEffect>,
}

impl DirectiveOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A comment standing in for a directive that could not be understood.
    pub fn inert(message: &str) -> Self {
        let single_line: String = message
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        Self {
            fragments: vec![Fragment::Code(format!("// {}", single_line.trim_end()))],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.fragments.as_slice(), [Fragment::Code(code)] if code.starts_with("//"))
    }

    /// Host statements only, joined by a space.
    pub fn code(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Code(code) => Some(code.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders the fragments into host template text.
    pub fn render(&self, fences: &CodeFences) -> String {
        let mut out = String::new();
        let mut pending_code: Vec<&str> = Vec::new();

        for fragment in &self.fragments {
            match fragment {
                Fragment::Code(code) => pending_code.push(code),
                Fragment::Echo(expr) => {
                    flush_code(&mut out, &mut pending_code, fences);
                    out.push_str(&fences.open);
                    out.push_str("echo ");
                    out.push_str(expr);
                    out.push(';');
                    out.push_str(&fences.close);
                }
                Fragment::Markup(markup) => {
                    flush_code(&mut out, &mut pending_code, fences);
                    out.push_str(markup);
                }
            }
        }
        flush_code(&mut out, &mut pending_code, fences);
        out
    }
}

fn flush_code(out: &mut String, pending: &mut Vec<&str>, fences: &CodeFences) {
    if !pending.is_empty() {
        out.push_str(&fences.open);
        out.push_str(&pending.join(" "));
        out.push_str(&fences.close);
        pending.clear();
    }
}

/// `$__helper->setState($__VIEW_PATH__, $__VIEW_ID__, 'key', value);`
pub(crate) fn set_state_call(key: &str, value: &str) -> String {
    format!(
        "{HELPER}->setState({VIEW_PATH}, {VIEW_ID}, {}, {value});",
        host_string(key)
    )
}

/// Single-quoted host string literal.
pub(crate) fn host_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
