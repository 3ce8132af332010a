//! Template compiler.
//!
//! Scans template source for `@name(...)` directive occurrences and replaces
//! each with the glue rendered by its processor. Static text between
//! directives is copied through (and optionally minified).

use crate::directives::{CodeFences, DirectiveKind, DirectiveOutput, StoreEffect};
use crate::expr::{matching_paren, DependencySet};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub minify: bool,
    pub source_map: bool,
    pub fences: CodeFences,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    pub fn with_fences(mut self, fences: CodeFences) -> Self {
        self.fences = fences;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// One directive occurrence after processing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDirective {
    pub kind: DirectiveKind,
    pub expression: String,
    pub output: DirectiveOutput,
    pub source_offset: usize,
    pub source_line: usize,
    pub source_column: usize,
    pub output_offset: usize,
}

impl CompiledDirective {
    pub fn dependencies(&self) -> &DependencySet {
        &self.output.dependencies
    }

    pub fn effects(&self) -> &[StoreEffect] {
        &self.output.effects
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMapping {
    pub directive: String,
    pub source_line: usize,
    pub source_column: usize,
    pub source_offset: usize,
    pub output_offset: usize,
}

/// Directive-level mapping from compiled output back to the template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMap {
    pub version: u32,
    pub source: String,
    pub mappings: Vec<PositionMapping>,
}

impl PositionMap {
    pub const VERSION: u32 = 1;

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub source_name: String,
    pub template: String,
    pub directives: Vec<CompiledDirective>,
    pub dependencies: DependencySet,
    pub diagnostics: Vec<Diagnostic>,
    pub position_map: Option<PositionMap>,
    pub elapsed: Duration,
}

impl CompiledTemplate {
    pub fn outputs(&self) -> impl Iterator<Item = &CompiledDirective> {
        self.directives
            .iter()
            .filter(|directive| directive.kind == DirectiveKind::Out && !directive.output.is_empty())
    }

    pub fn attributes(&self) -> impl Iterator<Item = &CompiledDirective> {
        self.directives.iter().filter(|directive| {
            directive
                .effects()
                .iter()
                .any(|effect| matches!(effect, StoreEffect::RegisterAttribute { .. }))
        })
    }

    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCompiler {
    options: CompileOptions,
}

impl TemplateCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, source_name: &str, source: &str) -> CompiledTemplate {
        let start = Instant::now();
        let lines = LineIndex::new(source);
        let bytes = source.as_bytes();

        let mut template = String::with_capacity(source.len());
        let mut pending_static = String::new();
        let mut directives = Vec::new();
        let mut dependencies = DependencySet::new();
        let mut diagnostics = Vec::new();

        let mut copied_to = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'@' || (i > 0 && is_identifier_byte(bytes[i - 1])) {
                i += 1;
                continue;
            }

            // `@@name` prints a literal `@name`
            if bytes.get(i + 1) == Some(&b'@') {
                let name_end = identifier_end(bytes, i + 2);
                if name_end > i + 2 {
                    pending_static.push_str(&source[copied_to..i]);
                    pending_static.push_str(&source[i + 1..name_end]);
                    copied_to = name_end;
                    i = name_end;
                } else {
                    i += 2;
                }
                continue;
            }

            let name_end = identifier_end(bytes, i + 1);
            let Some(kind) = DirectiveKind::from_name(&source[i + 1..name_end]) else {
                i = name_end.max(i + 1);
                continue;
            };

            let open = name_end
                + bytes[name_end..]
                    .iter()
                    .take_while(|b| **b == b' ' || **b == b'\t')
                    .count();
            if bytes.get(open) != Some(&b'(') {
                i = name_end;
                continue;
            }

            let Some(close) = matching_paren(source, open) else {
                let (line, column) = lines.position(i);
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    message: format!("unterminated @{} directive", kind.name()),
                    line,
                    column,
                });
                i = name_end;
                continue;
            };

            pending_static.push_str(&source[copied_to..i]);
            self.flush_static(&mut template, &mut pending_static);

            let expression = &source[open + 1..close];
            let output = kind.process(expression);
            let (line, column) = lines.position(i);

            dependencies.union(&output.dependencies);
            let output_offset = template.len();
            template.push_str(&output.render(&self.options.fences));

            directives.push(CompiledDirective {
                kind,
                expression: expression.to_string(),
                output,
                source_offset: i,
                source_line: line,
                source_column: column,
                output_offset,
            });

            copied_to = close + 1;
            i = close + 1;
        }

        pending_static.push_str(&source[copied_to..]);
        self.flush_static(&mut template, &mut pending_static);

        let position_map = self.options.source_map.then(|| PositionMap {
            version: PositionMap::VERSION,
            source: source_name.to_string(),
            mappings: directives
                .iter()
                .map(|directive| PositionMapping {
                    directive: directive.kind.name().to_string(),
                    source_line: directive.source_line,
                    source_column: directive.source_column,
                    source_offset: directive.source_offset,
                    output_offset: directive.output_offset,
                })
                .collect(),
        });

        CompiledTemplate {
            source_name: source_name.to_string(),
            template,
            directives,
            dependencies,
            diagnostics,
            position_map,
            elapsed: start.elapsed(),
        }
    }

    fn flush_static(&self, template: &mut String, pending: &mut String) {
        if pending.is_empty() {
            return;
        }
        if self.options.minify {
            template.push_str(&minify_markup(pending));
        } else {
            template.push_str(pending);
        }
        pending.clear();
    }
}

/// Collapses whitespace runs to one space and drops whitespace between tags.
pub fn minify_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if !ch.is_whitespace() {
            out.push(ch);
            continue;
        }
        while chars.peek().is_some_and(|next| next.is_whitespace()) {
            chars.next();
        }
        let between_tags = out.ends_with('>') && chars.peek() == Some(&'<');
        if !between_tags {
            out.push(' ');
        }
    }
    out
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn identifier_end(bytes: &[u8], start: usize) -> usize {
    start
        + bytes
            .get(start..)
            .unwrap_or_default()
            .iter()
            .take_while(|b| is_identifier_byte(**b))
            .count()
}

/// 1-based line/column lookup for byte offsets.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> CompiledTemplate {
        TemplateCompiler::default().compile("test.blade.php", source)
    }

    #[test]
    fn test_static_text_passes_through() {
        let compiled = compile("<div>hello</div>");
        assert_eq!(compiled.template, "<div>hello</div>");
        assert!(compiled.directives.is_empty());
    }

    #[test]
    fn test_directive_is_replaced() {
        let compiled = compile("<p>@let($a = 1)</p>");
        assert_eq!(compiled.template, "<p><?php $a = 1; ?></p>");
        assert_eq!(compiled.directives.len(), 1);
        assert_eq!(compiled.directives[0].kind, DirectiveKind::Let);
        assert_eq!(compiled.directives[0].output_offset, 3);
    }

    #[test]
    fn test_nested_parens_and_quotes_in_arguments() {
        let compiled = compile("@exec(f(')'), g(1))x");
        assert_eq!(compiled.template, "<?php f(')'); g(1); ?>x");
    }

    #[test]
    fn test_email_and_unknown_directives_are_verbatim() {
        let source = "mail me@example.com @if($a) @endif";
        let compiled = compile(source);
        assert_eq!(compiled.template, source);
        assert!(compiled.directives.is_empty());
    }

    #[test]
    fn test_escaped_directive() {
        let compiled = compile("@@out($a)");
        assert_eq!(compiled.template, "@out($a)");
        assert!(compiled.directives.is_empty());
    }

    #[test]
    fn test_unterminated_directive_is_reported() {
        let compiled = compile("line\n  @out($a . ");
        assert_eq!(compiled.template, "line\n  @out($a . ");
        assert_eq!(compiled.diagnostics.len(), 1);
        assert_eq!(compiled.diagnostics[0].line, 2);
        assert_eq!(compiled.diagnostics[0].column, 3);
        assert_eq!(compiled.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_dependencies_union_across_directives() {
        let compiled = compile("@out($a . $b->c) @attr('id', $userId) @out($a)");
        let deps: Vec<&str> = compiled.dependencies.iter().collect();
        assert_eq!(deps, vec!["a", "b", "userId"]);
        assert_eq!(compiled.outputs().count(), 2);
        assert_eq!(compiled.attributes().count(), 1);
    }

    #[test]
    fn test_minify_static_text_only() {
        let compiler = TemplateCompiler::new(CompileOptions::new().with_minify(true));
        let compiled = compiler.compile(
            "t",
            "<ul>\n    <li>a   b</li>\n</ul>\n@exec($x = '  keep  ')",
        );
        assert_eq!(
            compiled.template,
            "<ul><li>a b</li></ul> <?php $x = '  keep  '; ?>"
        );
    }

    #[test]
    fn test_position_map() {
        let compiler = TemplateCompiler::new(CompileOptions::new().with_source_map(true));
        let compiled = compiler.compile("pages/home.blade.php", "<a>\n@out($x)</a>");
        let map = compiled.position_map.expect("position map");
        assert_eq!(map.source, "pages/home.blade.php");
        assert_eq!(map.mappings.len(), 1);
        assert_eq!(map.mappings[0].directive, "out");
        assert_eq!(map.mappings[0].source_line, 2);
        assert_eq!(map.mappings[0].source_offset, 4);
        assert_eq!(map.mappings[0].output_offset, 4);
        assert!(map.to_json().contains("\"version\": 1"));
    }

    #[test]
    fn test_custom_fences() {
        let compiler = TemplateCompiler::new(
            CompileOptions::new().with_fences(CodeFences::new("{% ", " %}")),
        );
        let compiled = compiler.compile("t", "@exec($a = 1)");
        assert_eq!(compiled.template, "{% $a = 1; %}");
    }
}
