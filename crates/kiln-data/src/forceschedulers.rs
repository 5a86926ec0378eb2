//! Force-scheduler endpoints: describe, list and the `force` control action.
//!
//! Backs `GET /forceschedulers`, `GET /forceschedulers/{name}`,
//! `GET /builders/{builderId}/forceschedulers` and the `force` action on a
//! named scheduler.

use std::sync::Arc;

use kiln_scheduler::TriggerRegistry;
use kiln_store::Store;
use serde_json::{Map, Value};

use crate::error::DataError;

pub struct ForceSchedulers {
  registry: Arc<TriggerRegistry>,
  store: Arc<dyn Store>,
}

impl ForceSchedulers {
  pub fn new(registry: Arc<TriggerRegistry>, store: Arc<dyn Store>) -> Self {
    Self { registry, store }
  }

  /// Wire descriptor for a named trigger, or `None` when the name does not
  /// resolve. An unresolved name is a normal state for a polling client,
  /// never an error.
  pub fn describe(&self, name: &str) -> Option<Value> {
    self
      .registry
      .find(name)
      .map(|trigger| trigger.definition.describe())
  }

  /// Descriptors for all registered triggers, optionally restricted to
  /// those applying to one builder.
  ///
  /// A builder id is resolved to its name first; only definitions whose
  /// `builder_names` contains that name are included.
  pub async fn list(&self, builder_id: Option<i64>) -> Result<Vec<Value>, DataError> {
    let builder_name = match builder_id {
      Some(id) => Some(self.store.get_builder(id).await?.name),
      None => None,
    };

    Ok(
      self
        .registry
        .iter()
        .filter(|trigger| match &builder_name {
          Some(name) => trigger.definition.builder_names.contains(name),
          None => true,
        })
        .map(|trigger| trigger.definition.describe())
        .collect(),
    )
  }

  /// Run the `force` action on a named trigger.
  ///
  /// An unresolved name is a no-op returning `Ok(None)`; callers check for
  /// `None` rather than relying on an error. On success the mechanism's
  /// opaque result is returned; a validation failure surfaces as
  /// [`DataError::InvalidParams`] carrying the full error set.
  pub async fn force(
    &self,
    name: &str,
    args: &Map<String, Value>,
  ) -> Result<Option<Value>, DataError> {
    let Some(trigger) = self.registry.find(name) else {
      tracing::debug!(trigger = %name, "force requested for unknown trigger");
      return Ok(None);
    };
    let result = trigger.force(args).await?;
    Ok(Some(result))
  }
}
