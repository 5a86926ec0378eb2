//! Trigger definitions, the registry and the mechanism seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::fields::FieldSpec;
use crate::validation::{CollectedValidationError, ParameterBag, validate_params, with_default_owner};

/// Trigger names are stable lookup keys; keep them short.
pub const MAX_NAME_LEN: usize = 50;

/// Error raised while loading trigger configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("trigger name must not be empty")]
  EmptyName,

  #[error("trigger name '{0}' is longer than 50 characters")]
  NameTooLong(String),

  #[error("duplicate trigger name: {0}")]
  DuplicateName(String),
}

/// Error raised by a trigger mechanism while creating the unit of work.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  #[error("storage error: {0}")]
  Storage(#[from] kiln_store::Error),

  #[error("trigger mechanism error: {0}")]
  Mechanism(String),
}

/// Why a force action failed.
#[derive(Debug, thiserror::Error)]
pub enum ForceError {
  #[error(transparent)]
  Validation(#[from] CollectedValidationError),

  #[error(transparent)]
  Mechanism(#[from] TriggerError),
}

/// A named, pre-configured way to manually start a unit of work.
///
/// Created once during master configuration load and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
  pub name: String,

  #[serde(default)]
  pub button_name: String,

  #[serde(default)]
  pub label: String,

  #[serde(default)]
  pub builder_names: Vec<String>,

  #[serde(default = "default_enabled")]
  pub enabled: bool,

  #[serde(default)]
  pub fields: Vec<FieldSpec>,
}

fn default_enabled() -> bool {
  true
}

impl TriggerDefinition {
  /// Serialize to the wire descriptor consumed by client renderers.
  pub fn describe(&self) -> Value {
    json!({
      "name": self.name,
      "button_name": self.button_name,
      "label": self.label,
      "builder_names": self.builder_names,
      "enabled": self.enabled,
      "all_fields": self.fields,
    })
  }

  fn check(&self) -> Result<(), ConfigError> {
    if self.name.is_empty() {
      return Err(ConfigError::EmptyName);
    }
    if self.name.chars().count() > MAX_NAME_LEN {
      return Err(ConfigError::NameTooLong(self.name.clone()));
    }
    Ok(())
  }
}

/// The machinery a validated force request is handed to.
///
/// What it does internally is its own business; it returns an opaque result
/// (e.g. the identifier of the new unit of work).
#[async_trait]
pub trait TriggerMechanism: Send + Sync {
  async fn submit(
    &self,
    definition: &TriggerDefinition,
    params: &ParameterBag,
  ) -> Result<Value, TriggerError>;
}

/// A registered trigger: its definition plus the mechanism it forwards to.
pub struct ForceTrigger {
  pub definition: TriggerDefinition,
  mechanism: Arc<dyn TriggerMechanism>,
}

impl ForceTrigger {
  pub fn new(definition: TriggerDefinition, mechanism: Arc<dyn TriggerMechanism>) -> Self {
    Self {
      definition,
      mechanism,
    }
  }

  /// Validate `raw` against the definition's fields and forward the bag to
  /// the mechanism. The owner attribution is defaulted before validation.
  pub async fn force(&self, raw: &Map<String, Value>) -> Result<Value, ForceError> {
    let args = with_default_owner(raw);
    let params = validate_params(&self.definition.fields, &args)?;
    tracing::info!(
      trigger = %self.definition.name,
      owner = %params.owner(),
      "forcing a new unit of work"
    );
    Ok(self.mechanism.submit(&self.definition, &params).await?)
  }
}

/// Read-only registry of triggers, populated once at configuration load and
/// passed by reference into the endpoint layer.
pub struct TriggerRegistry {
  triggers: Vec<ForceTrigger>,
}

impl std::fmt::Debug for TriggerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TriggerRegistry").finish_non_exhaustive()
  }
}

impl TriggerRegistry {
  /// Build a registry, rejecting invalid or duplicate trigger names.
  pub fn new(triggers: Vec<ForceTrigger>) -> Result<Self, ConfigError> {
    for (i, trigger) in triggers.iter().enumerate() {
      trigger.definition.check()?;
      if triggers[..i]
        .iter()
        .any(|t| t.definition.name == trigger.definition.name)
      {
        return Err(ConfigError::DuplicateName(trigger.definition.name.clone()));
      }
    }
    Ok(Self { triggers })
  }

  /// Exact, case-sensitive lookup across enabled and disabled triggers.
  pub fn find(&self, name: &str) -> Option<&ForceTrigger> {
    self.triggers.iter().find(|t| t.definition.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ForceTrigger> {
    self.triggers.iter()
  }

  pub fn len(&self) -> usize {
    self.triggers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.triggers.is_empty()
  }
}
