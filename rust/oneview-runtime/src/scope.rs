//! One view state store per request.

use crate::effects::RenderContext;
use crate::error::Result;
use crate::hydration::HydrationRecord;
use crate::ids::new_token;
use crate::store::ViewStateStore;
use std::time::Instant;
use tracing::Span;

/// Owns the store for the lifetime of one request. Created when the request
/// starts and consumed by [`RequestScope::finish`] when it ends.
#[derive(Debug)]
pub struct RequestScope {
    id: String,
    store: ViewStateStore,
    /// Span every store write of this request is attributed to
    span: Span,
    started: Instant,
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestScope {
    pub fn new() -> Self {
        Self::with_store(ViewStateStore::new())
    }

    pub fn with_store(store: ViewStateStore) -> Self {
        let id = new_token();
        let span = tracing::info_span!("request_scope", request_id = %id);
        span.in_scope(|| tracing::debug!("request started"));
        Self {
            id,
            store,
            span,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ViewStateStore {
        &mut self.store
    }

    /// Binds a render context to `view`/`instance_id` within this request.
    pub fn render(&mut self, view: &str, instance_id: &str) -> Result<RenderContext<'_>> {
        let _guard = self.span.enter();
        tracing::trace!(view = %view, instance = %instance_id, "render");
        RenderContext::new(&mut self.store, view, instance_id)
    }

    /// Starts over for the next request on a persistent worker: the store is
    /// cleared and the scope gets a new id and span.
    pub fn reset(&mut self) {
        self.store.reset();
        self.id = new_token();
        self.span = tracing::info_span!("request_scope", request_id = %self.id);
        self.started = Instant::now();
    }

    /// Ends the request and returns the hydration export.
    pub fn finish(self) -> Vec<HydrationRecord> {
        let _guard = self.span.enter();
        let records = self.store.export_view_data();
        tracing::info!(
            views = self.store.views().count(),
            instances = records.len(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "request finished"
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finish_exports_every_instance() {
        let mut scope = RequestScope::new();
        scope
            .store_mut()
            .set_view_data("pages.home", "a1", json!({"title": "Home"}))
            .unwrap();
        scope.store_mut().register_view("layouts.app", "b1").unwrap();

        let records = scope.finish();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attributes["data-view-name"], "pages.home");
        assert_eq!(records[0].content, r#"{"title":"Home"}"#);
        assert_eq!(records[1].content, "{}");
    }

    #[test]
    fn test_reset_starts_a_new_request() {
        let mut scope = RequestScope::new();
        let first_id = scope.id().to_string();
        scope.store_mut().register_view("v", "a1").unwrap();
        scope.reset();
        assert_ne!(scope.id(), first_id);
        assert_eq!(scope.store().instance_count(), 0);
    }

    #[test]
    fn test_scopes_are_independent() {
        let mut a = RequestScope::new();
        let b = RequestScope::new();
        a.store_mut().register_view("v", "a1").unwrap();
        assert_eq!(b.store().instance_count(), 0);
        assert_ne!(a.id(), b.id());
    }
}
