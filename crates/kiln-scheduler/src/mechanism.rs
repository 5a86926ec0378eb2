//! Store-backed default trigger mechanism.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_properties::PropertySet;
use kiln_store::Store;
use serde_json::{Value, json};

use crate::trigger::{TriggerDefinition, TriggerError, TriggerMechanism};
use crate::validation::ParameterBag;

/// Provenance recorded on properties set through a force action.
pub const FORCE_SOURCE: &str = "Force Build Form";

/// Creates a buildset carrying the validated parameters as properties.
///
/// The opaque trigger result is `{"bsid": <new buildset id>}`.
pub struct BuildsetMechanism {
  store: Arc<dyn Store>,
}

impl BuildsetMechanism {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl TriggerMechanism for BuildsetMechanism {
  async fn submit(
    &self,
    _definition: &TriggerDefinition,
    params: &ParameterBag,
  ) -> Result<Value, TriggerError> {
    let reason = match params.get("reason").and_then(Value::as_str) {
      Some(reason) => format!("A build was forced by '{}': {}", params.owner(), reason),
      None => format!("A build was forced by '{}'", params.owner()),
    };

    let mut properties = PropertySet::new();
    for (name, value) in params.iter() {
      properties.set(name, value.clone(), FORCE_SOURCE);
    }

    let buildset_id = self.store.create_buildset(&reason, &properties).await?;
    tracing::debug!(buildset_id, "buildset created by force trigger");
    Ok(json!({"bsid": buildset_id}))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ForceTrigger, validate_params, with_default_owner};
  use kiln_store::MemoryStore;
  use serde_json::Map;

  fn definition() -> TriggerDefinition {
    TriggerDefinition {
      name: "force".into(),
      button_name: "Force".into(),
      label: "Force a build".into(),
      builder_names: vec![],
      enabled: true,
      fields: vec![crate::FieldSpec {
        name: "reason".into(),
        label: String::new(),
        required: false,
        default: Some(Value::from("force build")),
        kind: crate::FieldKind::Text,
      }],
    }
  }

  #[tokio::test]
  async fn submit_creates_buildset_with_parameters_as_properties() {
    let store = Arc::new(MemoryStore::new());
    let mechanism = BuildsetMechanism::new(store.clone());

    let args = with_default_owner(&Map::new());
    let params = validate_params(&definition().fields, &args).unwrap();
    let result = mechanism.submit(&definition(), &params).await.unwrap();

    let buildset_id = result["bsid"].as_i64().unwrap();
    let buildset = store.get_buildset(buildset_id).await.unwrap();
    assert_eq!(buildset.reason, "A build was forced by 'user': force build");

    let props = store.get_buildset_properties(buildset_id).await.unwrap();
    assert_eq!(props.get("owner").unwrap().value, Value::from("user"));
    assert_eq!(props.get("reason").unwrap().source, FORCE_SOURCE);
  }

  #[tokio::test]
  async fn force_end_to_end_returns_buildset_id() {
    let store = Arc::new(MemoryStore::new());
    let trigger = ForceTrigger::new(definition(), Arc::new(BuildsetMechanism::new(store)));

    let mut args = Map::new();
    args.insert("owner".into(), Value::from("alice"));
    args.insert("reason".into(), Value::from("regression hunt"));

    let result = trigger.force(&args).await.unwrap();
    assert!(result["bsid"].is_i64());
  }
}
