use crate::escape::escape_html;
use serde::Serialize;

pub const DEFAULT_WRAPPER_TAG: &str = "div";
/// Marks the element wrapping a view instance.
pub const WRAPPER_ATTRIBUTE: &str = "data-view-wrapper";

/// How a wrapper element is described by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WrapperSpec {
    #[default]
    Default,
    Tag(String),
    /// A tag together with its own attributes.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
}

impl From<&str> for WrapperSpec {
    fn from(tag: &str) -> Self {
        if tag.trim().is_empty() {
            Self::Default
        } else {
            Self::Tag(tag.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperFrame {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub instance_id: Option<String>,
}

impl WrapperFrame {
    /// Resolves `spec` into a frame. Attributes carried by an
    /// [`WrapperSpec::Element`] replace `attributes`.
    pub fn new(
        spec: WrapperSpec,
        attributes: Vec<(String, String)>,
        instance_id: Option<&str>,
    ) -> Self {
        let (tag, mut attributes) = match spec {
            WrapperSpec::Default => (DEFAULT_WRAPPER_TAG.to_string(), attributes),
            WrapperSpec::Tag(tag) => (tag, attributes),
            WrapperSpec::Element { tag, attributes } => (tag, attributes),
        };
        attributes.retain(|(key, _)| key != WRAPPER_ATTRIBUTE);
        attributes.push((
            WRAPPER_ATTRIBUTE.to_string(),
            instance_id.unwrap_or_default().to_string(),
        ));
        Self {
            tag,
            attributes,
            instance_id: instance_id.map(str::to_string),
        }
    }

    pub fn open_tag(&self) -> String {
        let attributes: Vec<String> = self
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}=\"{}\"", escape_html(value)))
            .collect();
        format!("<{} {}>", self.tag, attributes.join(" "))
    }

    pub fn close_tag(&self) -> String {
        format!("</{}>", self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wrapper_is_div() {
        let frame = WrapperFrame::new(WrapperSpec::Default, Vec::new(), Some("a1"));
        assert_eq!(frame.open_tag(), r#"<div data-view-wrapper="a1">"#);
        assert_eq!(frame.close_tag(), "</div>");
    }

    #[test]
    fn test_element_spec_carries_attributes() {
        let spec = WrapperSpec::Element {
            tag: "section".into(),
            attributes: vec![("class".into(), "card \"big\"".into())],
        };
        let frame = WrapperFrame::new(spec, vec![("ignored".into(), "x".into())], Some("a1"));
        assert_eq!(
            frame.open_tag(),
            r#"<section class="card &quot;big&quot;" data-view-wrapper="a1">"#
        );
    }

    #[test]
    fn test_blank_tag_falls_back_to_default() {
        assert_eq!(WrapperSpec::from(" "), WrapperSpec::Default);
        assert_eq!(WrapperSpec::from("span"), WrapperSpec::Tag("span".into()));
    }
}
