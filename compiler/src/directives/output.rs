//! `@out`: a refreshable output region.

use super::{
    DirectiveOutput, DirectiveProcessor, Fragment, StoreEffect, HELPER, OUTPUT_TASK_ID, VIEW_ID,
    VIEW_PATH,
};
use crate::expr::extract_variable_references;

pub const OUTPUT_BEGIN_MARKER: &str = "<!-- [one:output id=\"";
pub const OUTPUT_BEGIN_MARKER_END: &str = "\"] -->";
pub const OUTPUT_END_MARKER: &str = "<!-- [/one:output] -->";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputProcessor;

impl DirectiveProcessor for OutputProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput {
        let content = expression.trim();
        if content.is_empty() {
            return DirectiveOutput::empty();
        }

        let dependencies = extract_variable_references(content);
        let register = format!(
            "{OUTPUT_TASK_ID} = {HELPER}->newTaskId(); \
             {HELPER}->addOutputComponent({VIEW_PATH}, {VIEW_ID}, {OUTPUT_TASK_ID}, \"{}\");",
            dependencies.to_csv()
        );

        DirectiveOutput {
            fragments: vec![
                Fragment::Code(register),
                Fragment::Markup(OUTPUT_BEGIN_MARKER.to_string()),
                Fragment::Echo(OUTPUT_TASK_ID.to_string()),
                Fragment::Markup(OUTPUT_BEGIN_MARKER_END.to_string()),
                Fragment::Echo(content.to_string()),
                Fragment::Markup(OUTPUT_END_MARKER.to_string()),
            ],
            effects: vec![StoreEffect::RegisterOutput {
                dependencies: dependencies.clone(),
            }],
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::CodeFences;

    #[test]
    fn test_output_dependencies() {
        let output = OutputProcessor.process("$a . $b->c");
        let deps: Vec<&str> = output.dependencies.iter().collect();
        assert_eq!(deps, vec!["a", "b"]);
        assert_eq!(
            output.effects,
            vec![StoreEffect::RegisterOutput {
                dependencies: output.dependencies.clone(),
            }]
        );
    }

    #[test]
    fn test_output_markup() {
        let rendered = OutputProcessor
            .process("$total")
            .render(&CodeFences::default());
        assert_eq!(
            rendered,
            "<?php $__OC_TASK_ID__ = $__helper->newTaskId(); \
             $__helper->addOutputComponent($__VIEW_PATH__, $__VIEW_ID__, $__OC_TASK_ID__, \"total\"); ?>\
             <!-- [one:output id=\"<?php echo $__OC_TASK_ID__; ?>\"] -->\
             <?php echo $total; ?>\
             <!-- [/one:output] -->"
        );
    }

    #[test]
    fn test_output_empty_expression() {
        let output = OutputProcessor.process("   ");
        assert!(output.is_empty());
        assert!(output.effects.is_empty());
    }
}
