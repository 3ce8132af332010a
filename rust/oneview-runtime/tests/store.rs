use oneview_compiler::{CompileOptions, TemplateCompiler};
use oneview_runtime::{
    render_records, AttrTarget, PlainData, RequestScope, StoreError, ViewRef, ViewStateStore,
    WrapperSpec,
};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Product {
    sku: String,
    price_cents: u32,
    tags: Vec<String>,
}

#[test]
fn test_render_lifecycle_exports_hydration() {
    let mut scope = RequestScope::new();
    let store = scope.store_mut();

    let product = Product {
        sku: "tea-01".into(),
        price_cents: 250,
        tags: vec!["hot".into()],
    };
    store
        .set_view_data(
            "pages.product",
            "p1",
            PlainData::serialize(&product).unwrap(),
        )
        .unwrap();
    store
        .set_parent_view("pages.product", "p1", ViewRef::new("layouts.app", "l1").unwrap())
        .unwrap();
    store
        .add_child_view("layouts.app", "l1", ViewRef::new("pages.product", "p1").unwrap())
        .unwrap();
    store.subscribe_state("pages.product", "p1", true).unwrap();

    assert_eq!(
        store.view_data("pages.product", "p1").unwrap(),
        &json!({"sku": "tea-01", "price_cents": 250, "tags": ["hot"]})
    );

    let records = scope.finish();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].attributes["data-view-id"], "p1");
    assert_eq!(records[1].attributes["data-view-name"], "layouts.app");

    let html = render_records(&records);
    assert_eq!(html.lines().count(), 2);
    assert!(html.contains(r#"type="application/json""#));
}

#[test]
fn test_application_snapshot_serializes_bindings() {
    let mut store = ViewStateStore::new();
    store
        .add_event_listener("pages.home", "a1", "click", json!(["increment"]))
        .unwrap();
    store
        .add_output_component("pages.home", "a1", "task-1", "count")
        .unwrap();
    store
        .set_state("pages.home", "a1", "count", json!({"value": 1}))
        .unwrap();
    store
        .set_super_view("pages.home", "a1", ViewRef::new("layouts.base", "s1").unwrap())
        .unwrap();

    let snapshot = serde_json::to_value(store.export_application_data()).unwrap();
    let instance = &snapshot["views"][0]["instances"][0];
    assert_eq!(snapshot["views"][0]["name"], "pages.home");
    assert_eq!(instance["events"][0]["id"], "a1-click-0");
    assert_eq!(instance["events"][0]["type"], "click");
    assert_eq!(instance["outputComponents"][0]["stateKeys"], json!(["count"]));
    assert_eq!(instance["states"]["count"], json!({"value": 1}));
    assert_eq!(instance["super"]["name"], "layouts.base");
}

#[test]
fn test_single_attribute_target() {
    let mut store = ViewStateStore::new();
    let markup = store
        .add_tag_attribute(
            "v",
            "a1",
            Default::default(),
            AttrTarget::single("id", "user-7"),
        )
        .unwrap();
    assert!(markup.starts_with(" data-one-attribute-id=\""));
    assert!(markup.ends_with(r#" id="user-7""#));
}

#[test]
fn test_wrapper_attr_and_origin() {
    let mut store = ViewStateStore::new();
    assert_eq!(store.wrapper_attr("a1"), r#" data-view-wrapper="a1""#);
    store
        .set_origin_view("v", "a1", ViewRef::new("pages.list", "o1").unwrap())
        .unwrap();
    assert_eq!(
        store.instance("v", "a1").unwrap().origin,
        Some(ViewRef::new("pages.list", "o1").unwrap())
    );
    let open = store.start_wrapper(
        WrapperSpec::Tag("article".into()),
        vec![("class".into(), "card".into())],
        Some("a1"),
    );
    assert_eq!(open, r#"<article class="card" data-view-wrapper="a1">"#);
}

#[test]
fn test_validation_errors_surface() {
    let mut store = ViewStateStore::new();
    assert_eq!(
        store.set_state("v", "a1", " ", 1i64).unwrap_err(),
        StoreError::InvalidStateKey(" ".into())
    );
    assert!(ViewRef::new("", "x").is_err());
}

#[test]
fn test_compiled_counter_effects_apply_to_scope() {
    let source = "@useState($count, 0)\n<button>@out($count)</button>";
    let template = TemplateCompiler::new(CompileOptions::default()).compile("counter.blade.php", source);

    let mut scope = RequestScope::new();
    {
        let mut context = scope.render("pages.counter", "c1").unwrap();
        let mut evaluator = |expression: &str| match expression {
            "0" => PlainData::from(0i64),
            _ => PlainData::null(),
        };
        for directive in &template.directives {
            context
                .apply_directive(&directive.output, &mut evaluator)
                .unwrap();
        }
    }

    let instance = scope.store().instance("pages.counter", "c1").unwrap();
    assert_eq!(instance.states["count"], json!(0));
    assert_eq!(instance.output_components.len(), 1);
    assert!(instance.output_components[0].state_keys.contains("count"));
}
