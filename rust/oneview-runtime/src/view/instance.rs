use crate::error::{Result, StoreError};
use oneview_compiler::{AttributeConfig, DependencySet};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Non-owning reference to another view instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRef {
    pub name: String,
    pub id: String,
}

impl ViewRef {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let id = id.into();
        if name.trim().is_empty() {
            return Err(StoreError::EmptyViewName);
        }
        if id.trim().is_empty() {
            return Err(StoreError::EmptyInstanceId { view: name });
        }
        Ok(Self { name, id })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBinding {
    /// `instanceId-eventType-index`
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub handlers: Value,
}

impl EventBinding {
    pub fn new(instance_id: &str, event_type: &str, index: usize, handlers: Value) -> Result<Self> {
        validate_event_type(event_type)?;
        Ok(Self {
            id: format!("{instance_id}-{event_type}-{index}"),
            event_type: event_type.to_string(),
            handlers,
        })
    }
}

/// Event types end up in attribute names (`data-click-id`), so only
/// identifier characters are accepted.
pub(crate) fn validate_event_type(event_type: &str) -> Result<()> {
    let mut chars = event_type.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidEventType(event_type.to_string()))
    }
}

/// A refreshable span of rendered output and the state keys it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputComponent {
    pub id: String,
    pub state_keys: DependencySet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeBinding {
    pub id: String,
    pub config: AttributeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInstance {
    pub view_id: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ViewRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<ViewRef>,
    #[serde(rename = "super", skip_serializing_if = "Option::is_none")]
    pub super_view: Option<ViewRef>,
    pub children: Vec<ViewRef>,
    pub events: Vec<EventBinding>,
    /// event type -> token -> handlers
    pub quick_handles: BTreeMap<String, BTreeMap<String, Value>>,
    pub subscribe: bool,
    pub output_components: Vec<OutputComponent>,
    pub attributes: Vec<AttributeBinding>,
    pub states: BTreeMap<String, Value>,
}

impl ViewInstance {
    pub fn new(view: &str, id: &str) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(StoreError::EmptyInstanceId {
                view: view.to_string(),
            });
        }
        Ok(Self {
            view_id: id.to_string(),
            data: Value::Object(Default::default()),
            parent: None,
            origin: None,
            super_view: None,
            children: Vec::new(),
            events: Vec::new(),
            quick_handles: BTreeMap::new(),
            subscribe: false,
            output_components: Vec::new(),
            attributes: Vec::new(),
            states: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_binding_id() {
        let binding = EventBinding::new("v1", "click", 2, json!(["save"])).unwrap();
        assert_eq!(binding.id, "v1-click-2");
    }

    #[test]
    fn test_event_type_validation() {
        assert!(validate_event_type("mouse-enter").is_ok());
        assert!(validate_event_type("key_up2").is_ok());
        assert!(validate_event_type("").is_err());
        assert!(validate_event_type("1click").is_err());
        assert!(validate_event_type("on click").is_err());
        assert!(validate_event_type("x\"y").is_err());
    }

    #[test]
    fn test_view_ref_validation() {
        assert!(ViewRef::new("layouts.app", "a1").is_ok());
        assert_eq!(
            ViewRef::new("layouts.app", "").unwrap_err(),
            StoreError::EmptyInstanceId {
                view: "layouts.app".into()
            }
        );
    }

    #[test]
    fn test_instance_serializes_camel_case() {
        let instance = ViewInstance::new("pages.home", "a1").unwrap();
        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["viewId"], "a1");
        assert!(value.get("quickHandles").is_some());
        assert!(value.get("parent").is_none());
    }
}
