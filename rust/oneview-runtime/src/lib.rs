//! # oneview-runtime
//!
//! Request-scoped view state for Oneview templates.
//!
//! While a page renders, the glue emitted by the template compiler records
//! every view instance together with its reactive state, event bindings,
//! refreshable output regions and attribute bindings. At the end of the
//! request the accumulated state is exported as JSON script elements the
//! client hydrates from.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use oneview_runtime::{RequestScope, ViewRef};
//! use serde_json::json;
//!
//! let mut scope = RequestScope::new();
//! let store = scope.store_mut();
//! store.set_view_data("pages.home", "a1", json!({ "title": "Home" }))?;
//! store.set_parent_view("pages.home", "a1", ViewRef::new("layouts.app", "b1")?)?;
//! let markup = store.add_event_listener("pages.home", "a1", "click", json!(["save"]))?.1;
//!
//! let hydration = scope.finish();
//! ```

pub mod effects;
pub mod error;
pub mod escape;
pub mod hydration;
pub mod ids;
pub mod plain;
pub mod scope;
pub mod store;
pub mod telemetry;
pub mod view;

pub use effects::{Applied, Evaluate, RenderContext};
pub use error::StoreError;
pub use hydration::{render_records, ApplicationSnapshot, HydrationRecord};
pub use plain::{PlainData, ToPlainData};
pub use scope::RequestScope;
pub use store::{AttrTarget, ViewStateStore};
pub use view::{
    AttributeBinding, EventBinding, OutputComponent, View, ViewInstance, ViewRef, WrapperFrame,
    WrapperSpec,
};
