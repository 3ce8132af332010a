//! Request-scoped registry of rendered views and their reactive bindings.
//!
//! Every operation lazily registers the view and instance it names, so the
//! host glue can call them in any order. Writes are not transactional: a
//! rejected input leaves earlier writes of the same render in place.

use crate::error::{Result, StoreError};
use crate::escape::escape_html;
use crate::hydration::{ApplicationSnapshot, HydrationRecord};
use crate::ids::new_token;
use crate::plain::PlainData;
use crate::view::{
    validate_event_type, AttributeBinding, EventBinding, OutputComponent, View, ViewInstance,
    ViewRef, WrapperFrame, WrapperSpec, WRAPPER_ATTRIBUTE,
};
use oneview_compiler::directives::is_reserved_attribute_key;
use oneview_compiler::{AttributeConfig, DependencySet};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::OnceLock;

/// Static attributes rendered next to a reactive attribute binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AttrTarget {
    #[default]
    None,
    Single {
        key: String,
        value: String,
    },
    Map(Vec<(String, String)>),
}

impl AttrTarget {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Single {
            key: key.into(),
            value: value.into(),
        }
    }

    fn pairs(&self) -> Vec<(&str, &str)> {
        match self {
            Self::None => Vec::new(),
            Self::Single { key, value } => vec![(key.as_str(), value.as_str())],
            Self::Map(pairs) => pairs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct ViewStateStore {
    views: Vec<View>,
    index: HashMap<String, usize>,
    wrappers: Vec<WrapperFrame>,
    system: Map<String, Value>,
    sink: Option<Box<dyn Write + Send>>,
}

impl fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("views", &self.views.len())
            .field("wrappers", &self.wrappers.len())
            .field("system", &self.system.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that also writes wrapper markup to `sink` as it is produced.
    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            ..Self::default()
        }
    }

    pub fn set_sink(&mut self, sink: impl Write + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn take_sink(&mut self) -> Option<Box<dyn Write + Send>> {
        self.sink.take()
    }

    fn view_mut(&mut self, name: &str) -> Result<&mut View> {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                self.views.push(View::new(name)?);
                let position = self.views.len() - 1;
                self.index.insert(name.to_string(), position);
                tracing::debug!(view = %name, "view registered");
                position
            }
        };
        Ok(&mut self.views[position])
    }

    fn instance_mut(&mut self, view: &str, id: &str) -> Result<&mut ViewInstance> {
        self.view_mut(view)?.instance_mut(id)
    }

    /// Registers `view` and its instance `id`. Idempotent.
    pub fn register_view(&mut self, view: &str, id: &str) -> Result<()> {
        self.instance_mut(view, id).map(|_| ())
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.index.get(name).map(|&position| &self.views[position])
    }

    pub fn instance(&self, view: &str, id: &str) -> Option<&ViewInstance> {
        self.view(view).and_then(|view| view.instance(id))
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.views.iter().map(View::instance_count).sum()
    }

    pub fn set_view_data(&mut self, view: &str, id: &str, data: impl Into<PlainData>) -> Result<()> {
        self.instance_mut(view, id)?.data = data.into().into_value();
        Ok(())
    }

    pub fn view_data(&mut self, view: &str, id: &str) -> Result<&Value> {
        Ok(&self.instance_mut(view, id)?.data)
    }

    pub fn set_parent_view(&mut self, view: &str, id: &str, parent: ViewRef) -> Result<()> {
        self.instance_mut(view, id)?.parent = Some(parent);
        Ok(())
    }

    pub fn set_origin_view(&mut self, view: &str, id: &str, origin: ViewRef) -> Result<()> {
        self.instance_mut(view, id)?.origin = Some(origin);
        Ok(())
    }

    pub fn set_super_view(&mut self, view: &str, id: &str, super_view: ViewRef) -> Result<()> {
        self.instance_mut(view, id)?.super_view = Some(super_view);
        Ok(())
    }

    pub fn add_child_view(&mut self, view: &str, id: &str, child: ViewRef) -> Result<()> {
        self.instance_mut(view, id)?.children.push(child);
        Ok(())
    }

    /// Appends an event binding and returns its id together with the
    /// attribute markup that links the element to it.
    pub fn add_event_listener(
        &mut self,
        view: &str,
        id: &str,
        event_type: &str,
        handlers: impl Into<PlainData>,
    ) -> Result<(String, String)> {
        let instance = self.instance_mut(view, id)?;
        let binding = EventBinding::new(
            id,
            event_type,
            instance.events.len(),
            handlers.into().into_value(),
        )?;
        let binding_id = binding.id.clone();
        instance.events.push(binding);

        let markup = format!(" data-{event_type}-id=\"{binding_id}\"");
        Ok((binding_id, markup))
    }

    pub fn add_event_quick_handle(
        &mut self,
        view: &str,
        id: &str,
        event_type: &str,
        handlers: impl Into<PlainData>,
    ) -> Result<String> {
        validate_event_type(event_type)?;
        let token = new_token();
        self.instance_mut(view, id)?
            .quick_handles
            .entry(event_type.to_string())
            .or_default()
            .insert(token.clone(), handlers.into().into_value());
        Ok(format!(" data-{event_type}-quick-id=\"{token}\""))
    }

    pub fn subscribe_state(&mut self, view: &str, id: &str, subscribe: bool) -> Result<()> {
        self.instance_mut(view, id)?.subscribe = subscribe;
        Ok(())
    }

    /// Registers an output region; returns its position in the instance.
    pub fn add_output_component(
        &mut self,
        view: &str,
        id: &str,
        task_id: &str,
        dependency_csv: &str,
    ) -> Result<usize> {
        let instance = self.instance_mut(view, id)?;
        instance.output_components.push(OutputComponent {
            id: task_id.to_string(),
            state_keys: DependencySet::from_csv(dependency_csv),
        });
        Ok(instance.output_components.len() - 1)
    }

    /// Appends an attribute binding under a fresh token. The markup carries
    /// the binding id followed by the current value of every non-reserved
    /// key in `target`.
    pub fn add_tag_attribute(
        &mut self,
        view: &str,
        id: &str,
        config: AttributeConfig,
        target: AttrTarget,
    ) -> Result<String> {
        let token = new_token();
        self.instance_mut(view, id)?.attributes.push(AttributeBinding {
            id: token.clone(),
            config,
        });

        let mut markup = format!(" data-one-attribute-id=\"{token}\"");
        for (key, value) in target.pairs() {
            if is_reserved_attribute_key(key) {
                continue;
            }
            markup.push_str(&format!(" {key}=\"{}\"", escape_html(value)));
        }
        Ok(markup)
    }

    pub fn set_state(
        &mut self,
        view: &str,
        id: &str,
        key: &str,
        value: impl Into<PlainData>,
    ) -> Result<()> {
        if key.trim().is_empty() {
            return Err(StoreError::InvalidStateKey(key.to_string()));
        }
        self.instance_mut(view, id)?
            .states
            .insert(key.to_string(), value.into().into_value());
        Ok(())
    }

    /// Extracts the first `<script>` and `<style>` bodies of `code` into the
    /// view's `init` script and style.
    pub fn add_init_code(&mut self, view: &str, id: &str, code: &str) -> Result<()> {
        self.register_view(view, id)?;
        let script = first_capture(script_pattern(), code);
        let style = first_capture(style_pattern(), code);

        let view = self.view_mut(view)?;
        if let Some(script) = script {
            view.scripts.insert("init".to_string(), script);
        }
        if let Some(style) = style {
            view.styles.insert("init".to_string(), style);
        }
        Ok(())
    }

    /// Pushes a wrapper frame and writes its opening tag.
    pub fn start_wrapper(
        &mut self,
        spec: WrapperSpec,
        attributes: Vec<(String, String)>,
        instance_id: Option<&str>,
    ) -> String {
        let frame = WrapperFrame::new(spec, attributes, instance_id);
        let markup = frame.open_tag();
        self.wrappers.push(frame);
        self.emit(&markup);
        markup
    }

    /// Pops the innermost wrapper and writes its closing tag. `None` when no
    /// wrapper is open.
    pub fn end_wrapper(&mut self) -> Option<String> {
        let frame = self.wrappers.pop()?;
        let markup = frame.close_tag();
        self.emit(&markup);
        Some(markup)
    }

    /// Inline form of the wrapper marker for an element the template opens itself.
    pub fn wrapper_attr(&mut self, instance_id: &str) -> String {
        let markup = format!(" {WRAPPER_ATTRIBUTE}=\"{}\"", escape_html(instance_id));
        self.emit(&markup);
        markup
    }

    pub fn wrapper_depth(&self) -> usize {
        self.wrappers.len()
    }

    fn emit(&mut self, markup: &str) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.write_all(markup.as_bytes()) {
                tracing::warn!(error = %err, "failed to write wrapper markup");
            }
        }
    }

    /// Merges `data` into the system data; later keys win.
    pub fn set_system_data(&mut self, data: Map<String, Value>) {
        self.system.extend(data);
    }

    pub fn system_data(&self) -> &Map<String, Value> {
        &self.system
    }

    /// One hydration record per registered instance, in registration order.
    pub fn export_view_data(&self) -> Vec<HydrationRecord> {
        self.views
            .iter()
            .flat_map(|view| {
                view.instances()
                    .map(move |instance| HydrationRecord::for_instance(&view.name, instance))
            })
            .collect()
    }

    pub fn export_application_data(&self) -> ApplicationSnapshot {
        ApplicationSnapshot {
            views: self.views.clone(),
            system: self.system.clone(),
        }
    }

    /// Drops every view, instance, open wrapper and the system data. The
    /// sink is kept.
    pub fn reset(&mut self) {
        self.views.clear();
        self.index.clear();
        self.wrappers.clear();
        self.system.clear();
    }
}

fn script_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)<script[^>]*>(.*?)</script>").ok())
        .as_ref()
}

fn style_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)<style[^>]*>(.*?)</style>").ok())
        .as_ref()
}

fn first_capture(pattern: Option<&Regex>, text: &str) -> Option<String> {
    let body = pattern?.captures(text)?.get(1)?.as_str();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_register_view_is_idempotent() {
        let mut store = ViewStateStore::new();
        store.register_view("pages.home", "a1").unwrap();
        store.register_view("pages.home", "a1").unwrap();
        assert_eq!(store.views().count(), 1);
        assert_eq!(store.instance_count(), 1);
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mut store = ViewStateStore::new();
        assert_eq!(
            store.register_view("", "a1").unwrap_err(),
            StoreError::EmptyViewName
        );
        assert!(matches!(
            store.register_view("pages.home", ""),
            Err(StoreError::EmptyInstanceId { .. })
        ));
        assert_eq!(store.instance_count(), 0);
    }

    #[test]
    fn test_event_ids_follow_declaration_order() {
        let mut store = ViewStateStore::new();
        let (first, markup) = store
            .add_event_listener("pages.home", "a1", "click", json!(["save"]))
            .unwrap();
        let (second, _) = store
            .add_event_listener("pages.home", "a1", "click", json!(["save"]))
            .unwrap();
        assert_eq!(first, "a1-click-0");
        assert_eq!(second, "a1-click-1");
        assert_eq!(markup, r#" data-click-id="a1-click-0""#);
    }

    #[test]
    fn test_invalid_event_type_registers_nothing() {
        let mut store = ViewStateStore::new();
        let err = store
            .add_event_listener("pages.home", "a1", "on click", Value::Null)
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidEventType("on click".into()));
        assert!(store.instance("pages.home", "a1").unwrap().events.is_empty());
    }

    #[test]
    fn test_quick_handle_markup() {
        let mut store = ViewStateStore::new();
        let markup = store
            .add_event_quick_handle("pages.home", "a1", "input", json!({"set": "name"}))
            .unwrap();
        let handles = &store.instance("pages.home", "a1").unwrap().quick_handles["input"];
        let token = handles.keys().next().unwrap();
        assert_eq!(markup, format!(" data-input-quick-id=\"{token}\""));
    }

    #[test]
    fn test_output_component_index() {
        let mut store = ViewStateStore::new();
        assert_eq!(store.add_output_component("v", "a1", "t1", "a,b").unwrap(), 0);
        assert_eq!(store.add_output_component("v", "a1", "t2", "").unwrap(), 1);
        let instance = store.instance("v", "a1").unwrap();
        assert_eq!(instance.output_components[0].state_keys.as_slice(), ["a", "b"]);
        assert!(instance.output_components[1].state_keys.is_empty());
    }

    #[test]
    fn test_tag_attribute_skips_reserved_keys_and_escapes() {
        let mut store = ViewStateStore::new();
        let target = AttrTarget::Map(vec![
            ("title".into(), "a \"quoted\" <b>".into()),
            ("#text".into(), "hidden".into()),
        ]);
        let markup = store
            .add_tag_attribute("v", "a1", AttributeConfig::new(), target)
            .unwrap();
        let binding_id = &store.instance("v", "a1").unwrap().attributes[0].id;
        assert_eq!(
            markup,
            format!(" data-one-attribute-id=\"{binding_id}\" title=\"a &quot;quoted&quot; &lt;b&gt;\"")
        );
    }

    #[test]
    fn test_tag_attribute_renders_plain_value_key() {
        let mut store = ViewStateStore::new();
        let markup = store
            .add_tag_attribute(
                "v",
                "a1",
                AttributeConfig::new(),
                AttrTarget::single("value", "ada"),
            )
            .unwrap();
        assert!(markup.ends_with(" value=\"ada\""), "{markup}");
    }

    #[test]
    fn test_init_code_extraction() {
        let mut store = ViewStateStore::new();
        store
            .add_init_code(
                "v",
                "a1",
                "<script type=\"module\">\nconsole.log(1)\n</script><style>.a{}</style>",
            )
            .unwrap();
        let view = store.view("v").unwrap();
        assert_eq!(view.scripts["init"], "\nconsole.log(1)\n");
        assert_eq!(view.styles["init"], ".a{}");

        store.add_init_code("w", "b1", "no tags here").unwrap();
        assert!(store.view("w").unwrap().scripts.is_empty());
    }

    #[test]
    fn test_wrappers_write_to_sink() {
        let buffer = SharedBuffer::default();
        let mut store = ViewStateStore::with_sink(buffer.clone());
        store.start_wrapper(WrapperSpec::from("section"), Vec::new(), Some("a1"));
        store.start_wrapper(WrapperSpec::Default, Vec::new(), Some("b1"));
        assert_eq!(store.wrapper_depth(), 2);
        assert_eq!(store.end_wrapper().as_deref(), Some("</div>"));
        assert_eq!(store.end_wrapper().as_deref(), Some("</section>"));
        assert_eq!(store.end_wrapper(), None);
        assert_eq!(
            buffer.contents(),
            r#"<section data-view-wrapper="a1"><div data-view-wrapper="b1"></div></section>"#
        );
    }

    #[test]
    fn test_system_data_merges() {
        let mut store = ViewStateStore::new();
        let first = json!({"locale": "en", "user": 1});
        let second = json!({"user": 2});
        store.set_system_data(first.as_object().unwrap().clone());
        store.set_system_data(second.as_object().unwrap().clone());
        assert_eq!(Value::Object(store.system_data().clone()), json!({"locale": "en", "user": 2}));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = ViewStateStore::new();
        store.set_state("v", "a1", "count", 1i64).unwrap();
        store.start_wrapper(WrapperSpec::Default, Vec::new(), Some("a1"));
        store.set_system_data(json!({"k": 1}).as_object().unwrap().clone());
        store.reset();
        assert_eq!(store.instance_count(), 0);
        assert_eq!(store.wrapper_depth(), 0);
        assert!(store.system_data().is_empty());
        assert!(store.export_view_data().is_empty());
    }
}
