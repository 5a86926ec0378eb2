//! Declarative field specifications for force-trigger parameters.
//!
//! Each field spec serializes to a self-describing wire object consumed by a
//! client form renderer: `name`, `label`, `required`, `default` plus a `type`
//! tag with kind-specific metadata.

use serde::{Deserialize, Serialize};

/// Validation rule for one field, tagged by kind.
///
/// New field kinds are added as new variants, each with its own check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
  /// Free-form text.
  Text,

  /// An integer value.
  Int,

  /// A boolean toggle.
  Bool,

  /// One value out of a fixed list. When `strict` is false the client may
  /// submit a value outside `choices`.
  Choice {
    choices: Vec<String>,
    #[serde(default = "default_strict")]
    strict: bool,
  },

  /// A nested group of sub-fields; the submitted value is a mapping.
  Nested { fields: Vec<FieldSpec> },
}

fn default_strict() -> bool {
  true
}

/// One accepted force-trigger parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name: String,

  #[serde(default)]
  pub label: String,

  #[serde(default)]
  pub required: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,

  #[serde(flatten)]
  pub kind: FieldKind,
}

impl FieldKind {
  /// Check a submitted value against this rule, returning the accepted value
  /// or the reason it was rejected.
  ///
  /// [`FieldKind::Nested`] is handled by the validator itself, since its
  /// errors carry the sub-field names.
  pub(crate) fn check(&self, value: &serde_json::Value) -> Result<serde_json::Value, String> {
    match self {
      FieldKind::Text => match value.as_str() {
        Some(s) => Ok(serde_json::Value::from(s)),
        None => Err("must be a string".to_string()),
      },
      FieldKind::Int => match value.as_i64() {
        Some(n) => Ok(serde_json::Value::from(n)),
        None => Err("must be an integer".to_string()),
      },
      FieldKind::Bool => match value.as_bool() {
        Some(b) => Ok(serde_json::Value::from(b)),
        None => Err("must be a boolean".to_string()),
      },
      FieldKind::Choice { choices, strict } => match value.as_str() {
        Some(s) if !*strict || choices.iter().any(|c| c == s) => Ok(serde_json::Value::from(s)),
        Some(s) => Err(format!("'{}' is not a valid choice", s)),
        None => Err("must be a string".to_string()),
      },
      FieldKind::Nested { .. } => match value.is_object() {
        true => Ok(value.clone()),
        false => Err("must be a mapping".to_string()),
      },
    }
  }
}
