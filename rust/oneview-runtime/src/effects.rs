//! Applies compiler-described store effects to a view instance.
//!
//! The template compiler records, next to the glue it emits, the store
//! writes that glue performs ([`StoreEffect`]). A Rust host renders a view by
//! binding a [`RenderContext`] to the instance and applying those effects,
//! supplying the values of host expressions through an [`Evaluate`].

use crate::error::Result;
use crate::ids::new_token;
use crate::plain::PlainData;
use crate::store::{AttrTarget, ViewStateStore};
use oneview_compiler::{AttributeConfig, DirectiveOutput, StoreEffect};

/// Produces the render-time value of a host expression.
pub trait Evaluate {
    fn evaluate(&mut self, expression: &str) -> PlainData;
}

impl<F> Evaluate for F
where
    F: FnMut(&str) -> PlainData,
{
    fn evaluate(&mut self, expression: &str) -> PlainData {
        self(expression)
    }
}

/// What applying one effect did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    State { key: String },
    Output { task_id: String, index: usize },
    Attribute { markup: String },
}

pub struct RenderContext<'a> {
    store: &'a mut ViewStateStore,
    view: String,
    instance_id: String,
}

impl<'a> RenderContext<'a> {
    /// Binds to `view`/`instance_id`, registering the instance.
    pub fn new(store: &'a mut ViewStateStore, view: &str, instance_id: &str) -> Result<Self> {
        store.register_view(view, instance_id)?;
        Ok(Self {
            store,
            view: view.to_string(),
            instance_id: instance_id.to_string(),
        })
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn store(&self) -> &ViewStateStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut ViewStateStore {
        &mut *self.store
    }

    pub fn apply<E: Evaluate + ?Sized>(
        &mut self,
        effect: &StoreEffect,
        evaluator: &mut E,
    ) -> Result<Applied> {
        match effect {
            StoreEffect::SetState { key, value_expr } => {
                let value = evaluator.evaluate(value_expr);
                self.store
                    .set_state(&self.view, &self.instance_id, key, value)?;
                Ok(Applied::State { key: key.clone() })
            }
            StoreEffect::RegisterOutput { dependencies } => {
                let task_id = new_token();
                let index = self.store.add_output_component(
                    &self.view,
                    &self.instance_id,
                    &task_id,
                    &dependencies.to_csv(),
                )?;
                Ok(Applied::Output { task_id, index })
            }
            StoreEffect::RegisterAttribute { config } => {
                let markup = self.register_attribute(config.clone(), AttrTarget::None)?;
                Ok(Applied::Attribute { markup })
            }
        }
    }

    pub fn apply_all<E: Evaluate + ?Sized>(
        &mut self,
        effects: &[StoreEffect],
        evaluator: &mut E,
    ) -> Result<Vec<Applied>> {
        effects
            .iter()
            .map(|effect| self.apply(effect, evaluator))
            .collect()
    }

    pub fn apply_directive<E: Evaluate + ?Sized>(
        &mut self,
        output: &DirectiveOutput,
        evaluator: &mut E,
    ) -> Result<Vec<Applied>> {
        let applied = self.apply_all(&output.effects, evaluator)?;
        tracing::trace!(
            view = %self.view,
            instance = %self.instance_id,
            effects = applied.len(),
            "directive applied"
        );
        Ok(applied)
    }

    /// Attribute binding with the current static values rendered alongside.
    pub fn register_attribute(
        &mut self,
        config: AttributeConfig,
        target: AttrTarget,
    ) -> Result<String> {
        self.store
            .add_tag_attribute(&self.view, &self.instance_id, config, target)
    }
}
