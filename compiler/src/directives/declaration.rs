//! `@let` / `@const`, `@useState` and `@exec`.

use super::{set_state_call, DirectiveOutput, DirectiveProcessor, Fragment, StoreEffect};
use crate::expr::{
    call_arguments, capitalize_first, extract_variable_references, find_top_level, is_identifier,
    is_quoted, split_params, split_top_level, strip_outer_parens, unquote, Nesting,
};

const USE_STATE: &str = "useState";

/// Variable declarations, including array and object destructuring.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationProcessor;

impl DirectiveProcessor for DeclarationProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput {
        let mut output = DirectiveOutput::empty();

        for segment in split_top_level(expression, ",") {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let Some((targets, value)) = split_destructuring(segment) else {
                output.fragments.push(Fragment::Code(format!("{segment};")));
                output
                    .dependencies
                    .union(&extract_variable_references(segment));
                continue;
            };

            let (left, right) = if targets.starts_with('{') {
                let names = object_target_names(targets);
                let pairs: Vec<String> = names
                    .iter()
                    .map(|name| format!("'{name}' => ${name}"))
                    .collect();
                (format!("[{}]", pairs.join(", ")), format!("(array) {value}"))
            } else {
                (normalize_array_targets(targets), value.to_string())
            };

            output
                .fragments
                .push(Fragment::Code(format!("{left} = {right};")));
            output
                .dependencies
                .union(&extract_variable_references(value));

            let target_names = extract_variable_references(&left);
            if is_use_state_call(value) {
                if let Some(first) = target_names.iter().next() {
                    let initial = call_arguments(value, USE_STATE)
                        .and_then(|args| split_params(args).first().copied())
                        .unwrap_or("null");
                    output
                        .fragments
                        .push(Fragment::Code(set_state_call(first, &format!("${first}"))));
                    output.effects.push(StoreEffect::SetState {
                        key: first.to_string(),
                        value_expr: initial.to_string(),
                    });
                }
            }
        }

        output
    }
}

/// `useState` in its map, two-argument and three-argument forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateProcessor;

impl DirectiveProcessor for UseStateProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput {
        let inner = strip_outer_parens(expression);

        if inner.len() >= 2 && inner.starts_with('[') && inner.ends_with(']') {
            let content = &inner[1..inner.len() - 1];
            if find_top_level(content, "=>").is_some() {
                return process_state_map(content, expression);
            }
        }

        let params = split_params(inner);
        match params.as_slice() {
            [name, value] => match variable_name(name) {
                Some(name) => {
                    let setter = format!("set{}", capitalize_first(name));
                    declare_state(name, &setter, value)
                }
                None => invalid_state(expression),
            },
            [value, name, setter] => match (state_name(name), state_name(setter)) {
                (Some(name), Some(setter)) => declare_state(name, setter, value),
                _ => invalid_state(expression),
            },
            _ => invalid_state(expression),
        }
    }
}

/// Arbitrary statements; top-level commas separate them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementProcessor;

impl DirectiveProcessor for StatementProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput {
        let inner = strip_outer_parens(expression);
        let mut nesting = Nesting::new();
        let rewritten: Vec<u8> = inner
            .bytes()
            .map(|byte| {
                if nesting.feed(byte) && byte == b',' {
                    b';'
                } else {
                    byte
                }
            })
            .collect();
        let rewritten = String::from_utf8(rewritten)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());

        let statements = rewritten.trim();
        if statements.is_empty() {
            return DirectiveOutput::empty();
        }

        let code = if statements.ends_with(';') {
            statements.to_string()
        } else {
            format!("{statements};")
        };

        DirectiveOutput {
            dependencies: extract_variable_references(&code),
            fragments: vec![Fragment::Code(code)],
            effects: Vec::new(),
        }
    }
}

fn declare_state(name: &str, setter: &str, value: &str) -> DirectiveOutput {
    let mut output = DirectiveOutput::empty();
    push_state(&mut output, name, setter, value);
    output
}

fn push_state(output: &mut DirectiveOutput, name: &str, setter: &str, value: &str) {
    output.fragments.push(Fragment::Code(format!(
        "[${name}, ${setter}] = {USE_STATE}({value});"
    )));
    output
        .fragments
        .push(Fragment::Code(set_state_call(name, &format!("${name}"))));
    output
        .dependencies
        .union(&extract_variable_references(value));
    output.effects.push(StoreEffect::SetState {
        key: name.to_string(),
        value_expr: value.to_string(),
    });
}

fn process_state_map(content: &str, original: &str) -> DirectiveOutput {
    let mut output = DirectiveOutput::empty();

    for pair in split_top_level(content, ",") {
        let Some(arrow) = find_top_level(pair, "=>") else {
            continue;
        };
        let key = unquote(pair[..arrow].trim());
        let key = key.strip_prefix('$').unwrap_or(key);
        let value = pair[arrow + 2..].trim();
        if !is_identifier(key) || value.is_empty() {
            continue;
        }
        let setter = format!("set{}", capitalize_first(key));
        push_state(&mut output, key, &setter, value);
    }

    if output.is_empty() {
        return invalid_state(original);
    }
    output
}

fn invalid_state(expression: &str) -> DirectiveOutput {
    DirectiveOutput::inert(&format!("Invalid @useState directive: {}", expression.trim()))
}

/// `$name` -> `name`
fn variable_name(text: &str) -> Option<&str> {
    text.strip_prefix('$').filter(|name| is_identifier(name))
}

/// `$name`, a quoted `'name'` or a bare `name`.
fn state_name(text: &str) -> Option<&str> {
    if is_quoted(text) {
        let name = unquote(text);
        return is_identifier(name).then_some(name);
    }
    variable_name(text).or_else(|| is_identifier(text).then_some(text))
}

/// Splits `[a, b] = expr` / `{a, b} = expr` into target list and value.
fn split_destructuring(segment: &str) -> Option<(&str, &str)> {
    let close = match segment.as_bytes().first()? {
        b'[' => ']',
        b'{' => '}',
        _ => return None,
    };
    let end = segment.find(close)?;
    if end < 2 {
        return None;
    }
    let rest = segment[end + 1..].trim_start();
    let value = rest.strip_prefix('=')?;
    if value.starts_with('=') || value.starts_with('>') {
        return None;
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((&segment[..=end], value))
}

/// `[$count, setCount]` -> `[$count, $setCount]`
fn normalize_array_targets(targets: &str) -> String {
    let inner = &targets[1..targets.len() - 1];
    let normalized: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .map(|target| {
            if is_identifier(target) {
                format!("${target}")
            } else {
                target.to_string()
            }
        })
        .collect();
    format!("[{}]", normalized.join(", "))
}

/// `{a, $b}` -> `["a", "b"]`
fn object_target_names(targets: &str) -> Vec<String> {
    targets[1..targets.len() - 1]
        .split(',')
        .map(|target| target.trim().trim_start_matches('$'))
        .filter(|target| is_identifier(target))
        .map(str::to_string)
        .collect()
}

fn is_use_state_call(value: &str) -> bool {
    value.match_indices(USE_STATE).any(|(i, _)| {
        let preceded_by_ident = value[..i]
            .bytes()
            .last()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$');
        !preceded_by_ident && value[i + USE_STATE.len()..].trim_start().starts_with('(')
    })
}
