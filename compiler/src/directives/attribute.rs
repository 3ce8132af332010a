//! `@attr`: reactive tag attributes.
//!
//! Accepts `'name', valueExpr` or `['name' => valueExpr, ...]`. Every value is
//! rewritten into a client render thunk so the attribute can be recomputed
//! when one of its dependencies changes.

use super::{
    host_string, DirectiveOutput, DirectiveProcessor, Fragment, StoreEffect, HELPER, VIEW_ID,
    VIEW_PATH,
};
use crate::expr::{
    is_quoted, split_params, split_top_level, transform_to_render_expression, unquote,
    DependencySet,
};
use serde::{Deserialize, Serialize};

/// Keys that address element content rather than a tag attribute.
pub const RESERVED_ATTRIBUTE_KEYS: [&str; 4] = ["#children", "#content", "#value", "#text"];

pub fn is_reserved_attribute_key(key: &str) -> bool {
    RESERVED_ATTRIBUTE_KEYS.contains(&key)
}

/// Client-side recomputation of one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderThunk {
    pub key: String,
    pub dependencies: DependencySet,
    /// `() => expr`
    pub render: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConfig {
    pub dependencies: DependencySet,
    pub attrs: Vec<RenderThunk>,
}

impl AttributeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the thunk for `key`, widening the binding dependencies.
    pub fn insert(&mut self, key: impl Into<String>, expression: &str) {
        let key = key.into();
        let (rendered, dependencies) = transform_to_render_expression(expression.trim());
        self.dependencies.union(&dependencies);

        let thunk = RenderThunk {
            key,
            dependencies,
            render: format!("() => {rendered}"),
        };
        match self.attrs.iter_mut().find(|existing| existing.key == thunk.key) {
            Some(existing) => *existing = thunk,
            None => self.attrs.push(thunk),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RenderThunk> {
        self.attrs.iter().find(|thunk| thunk.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|thunk| thunk.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Host map literal, e.g.
    /// `['dependencies' => ['id'], 'attrs' => ['title' => [...]]]`.
    pub fn to_host_literal(&self) -> String {
        let attrs: Vec<String> = self
            .attrs
            .iter()
            .map(|thunk| {
                format!(
                    "{} => ['dependencies' => {}, 'render' => {}]",
                    host_string(&thunk.key),
                    host_list(&thunk.dependencies),
                    host_string(&thunk.render)
                )
            })
            .collect();
        format!(
            "['dependencies' => {}, 'attrs' => [{}]]",
            host_list(&self.dependencies),
            attrs.join(", ")
        )
    }
}

fn host_list(set: &DependencySet) -> String {
    let items: Vec<String> = set.iter().map(host_string).collect();
    format!("[{}]", items.join(", "))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeProcessor;

impl DirectiveProcessor for AttributeProcessor {
    fn process(&self, expression: &str) -> DirectiveOutput {
        let expression = expression.trim();
        if expression.is_empty() {
            return DirectiveOutput::empty();
        }

        let config = if expression.starts_with('[') && expression.ends_with(']') {
            parse_map_form(&expression[1..expression.len() - 1])
        } else {
            parse_pair_form(expression)
        };

        let Some(config) = config.filter(|config| !config.is_empty()) else {
            return DirectiveOutput::inert(&format!("Invalid @attr directive: {expression}"));
        };

        let call = format!(
            "{HELPER}->addTagAttribute({VIEW_PATH}, {VIEW_ID}, {}, {expression})",
            config.to_host_literal()
        );

        DirectiveOutput {
            fragments: vec![Fragment::Echo(call)],
            dependencies: config.dependencies.clone(),
            effects: vec![StoreEffect::RegisterAttribute { config }],
        }
    }
}

/// `'name', valueExpr`
fn parse_pair_form(expression: &str) -> Option<AttributeConfig> {
    let params = split_params(expression);
    let (name, rest) = params.split_first()?;
    if !is_quoted(name) || unquote(name).is_empty() || rest.is_empty() {
        return None;
    }

    let mut config = AttributeConfig::new();
    config.insert(unquote(name), &rest.join(", "));
    Some(config)
}

/// `'a' => expr, 'b' => expr`
fn parse_map_form(content: &str) -> Option<AttributeConfig> {
    let mut config = AttributeConfig::new();

    for pair in split_top_level(content, ",") {
        let parts = split_top_level(pair, "=>");
        let [key, value @ ..] = parts.as_slice() else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let key = unquote(key.trim());
        let value = value.join("=>");
        if key.is_empty() || value.trim().is_empty() {
            continue;
        }
        config.insert(key, &value);
    }

    Some(config)
}
