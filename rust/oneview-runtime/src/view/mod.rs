//! Typed records held by the view state store.
//!
//! A [`View`] is keyed by its symbolic dotted name (`pages.home`) and owns
//! the [`ViewInstance`]s rendered during one request, in first-seen order.

mod instance;
mod wrapper;

pub use instance::{AttributeBinding, EventBinding, OutputComponent, ViewInstance, ViewRef};
pub(crate) use instance::validate_event_type;
pub use wrapper::{WrapperFrame, WrapperSpec, DEFAULT_WRAPPER_TAG, WRAPPER_ATTRIBUTE};

use crate::error::{Result, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub scripts: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    instances: Vec<ViewInstance>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoreError::EmptyViewName);
        }
        Ok(Self {
            name,
            scripts: BTreeMap::new(),
            styles: BTreeMap::new(),
            instances: Vec::new(),
            index: HashMap::new(),
        })
    }

    pub fn instance(&self, id: &str) -> Option<&ViewInstance> {
        self.index.get(id).map(|&position| &self.instances[position])
    }

    /// Returns the instance `id`, registering it first if needed.
    pub fn instance_mut(&mut self, id: &str) -> Result<&mut ViewInstance> {
        let position = match self.index.get(id) {
            Some(&position) => position,
            None => {
                let instance = ViewInstance::new(&self.name, id)?;
                self.instances.push(instance);
                let position = self.instances.len() - 1;
                self.index.insert(id.to_string(), position);
                tracing::trace!(view = %self.name, instance = %id, "instance registered");
                position
            }
        };
        Ok(&mut self.instances[position])
    }

    pub fn instances(&self) -> impl Iterator<Item = &ViewInstance> {
        self.instances.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_requires_name() {
        assert_eq!(View::new("  ").unwrap_err(), StoreError::EmptyViewName);
    }

    #[test]
    fn test_instances_keep_first_seen_order() {
        let mut view = View::new("pages.home").unwrap();
        view.instance_mut("b").unwrap();
        view.instance_mut("a").unwrap();
        view.instance_mut("b").unwrap();
        let ids: Vec<&str> = view.instances().map(|i| i.view_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(view.instance("a").is_some());
        assert!(view.instance("c").is_none());
    }
}
