//! Canonical Structured Logging
//!
//! Accumulates context while one template is compiled, emits ONE log line at the end.

use crate::compiler::CompiledTemplate;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
}

pub struct CanonicalLog {
    data: BTreeMap<String, Value>,
    start: Instant,
    level: LogLevel,
    emitted: bool,
}

impl CanonicalLog {
    pub fn new(view: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert("view".to_string(), json!(view));
        Self {
            data,
            start: Instant::now(),
            level: LogLevel::default(),
            emitted: false,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> &mut Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
        self
    }

    pub fn set_level(&mut self, level: LogLevel) -> &mut Self {
        self.level = level;
        self
    }

    pub fn inc(&mut self, key: &str, amount: i64) -> &mut Self {
        let current = self.data.get(key).and_then(|v| v.as_i64()).unwrap_or(0);
        self.data.insert(key.to_string(), json!(current + amount));
        self
    }

    /// Directive counts, dependency list and diagnostics of a compiled template.
    pub fn record_template(&mut self, template: &CompiledTemplate) -> &mut Self {
        self.set("directives", template.directives.len())
            .set("outputs", template.outputs().count())
            .set("attributes", template.attributes().count())
            .set("dependencies", &template.dependencies)
            .set("compile_us", template.elapsed.as_micros() as u64);
        if template.has_warnings() {
            self.inc("diagnostics", template.diagnostics.len() as i64)
                .set_level(LogLevel::Warn);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn duration_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn suppress(&mut self) {
        self.emitted = true;
    }

    pub fn emit(mut self) {
        self.do_emit();
    }

    fn do_emit(&mut self) {
        if self.emitted {
            return;
        }
        self.emitted = true;

        self.data
            .insert("duration_ms".to_string(), json!(self.duration_ms()));
        let canonical = serde_json::to_string(&self.data).unwrap_or_else(|_| "{}".to_string());

        match self.level {
            LogLevel::Trace => {
                tracing::trace!(target: "oneview::canonical", canonical = %canonical, "view_compiled")
            }
            LogLevel::Debug => {
                tracing::debug!(target: "oneview::canonical", canonical = %canonical, "view_compiled")
            }
            LogLevel::Info => {
                tracing::info!(target: "oneview::canonical", canonical = %canonical, "view_compiled")
            }
            LogLevel::Warn => {
                tracing::warn!(target: "oneview::canonical", canonical = %canonical, "view_compiled")
            }
        }
    }
}

impl Drop for CanonicalLog {
    fn drop(&mut self) {
        self.do_emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::TemplateCompiler;

    #[test]
    fn test_records_template_shape() {
        let template = TemplateCompiler::default().compile("t", "@out($a) @attr('id', $b) @out(");
        let mut log = CanonicalLog::new("pages.home");
        log.record_template(&template);
        log.suppress();

        assert_eq!(log.get("view"), Some(&json!("pages.home")));
        assert_eq!(log.get("directives"), Some(&json!(2)));
        assert_eq!(log.get("outputs"), Some(&json!(1)));
        assert_eq!(log.get("dependencies"), Some(&json!(["a", "b"])));
        assert_eq!(log.get("diagnostics"), Some(&json!(1)));
        assert_eq!(log.level, LogLevel::Warn);
    }

    #[test]
    fn test_increment() {
        let mut log = CanonicalLog::new("v");
        log.inc("skipped", 1);
        log.inc("skipped", 2);
        log.suppress();
        assert_eq!(log.get("skipped"), Some(&json!(3)));
    }
}
