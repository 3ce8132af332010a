//! Export of accumulated view state for client hydration.

use crate::escape::escape_html;
use crate::view::{View, ViewInstance};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const VIEW_DATA_REF: &str = "view-data";

/// A `<script type="application/json">` element carrying one instance payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydrationRecord {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub content: String,
}

impl HydrationRecord {
    pub fn for_instance(view: &str, instance: &ViewInstance) -> Self {
        let attributes = [
            ("type", "application/json"),
            ("data-view-id", instance.view_id.as_str()),
            ("data-view-name", view),
            ("data-ref", VIEW_DATA_REF),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        Self {
            tag: "script".to_string(),
            attributes,
            content: instance.data.to_string(),
        }
    }

    pub fn to_html(&self) -> String {
        let attributes: String = self
            .attributes
            .iter()
            .map(|(key, value)| format!(" {key}=\"{}\"", escape_html(value)))
            .collect();
        // `</` inside a JSON string would close the script element early
        let content = self.content.replace("</", "<\\/");
        format!("<{tag}{attributes}>{content}</{tag}>", tag = self.tag)
    }
}

pub fn render_records(records: &[HydrationRecord]) -> String {
    records
        .iter()
        .map(HydrationRecord::to_html)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything the store accumulated during one request.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSnapshot {
    pub views: Vec<View>,
    pub system: Map<String, Value>,
}

impl ApplicationSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
