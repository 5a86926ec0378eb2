//! The validation pipeline for force-trigger parameters.
//!
//! Given a raw map of untrusted wire values and a trigger's ordered field
//! specs, produce either a typed [`ParameterBag`] or a
//! [`CollectedValidationError`] carrying every field failure. All fields are
//! checked before failing so a client sees every problem in one round trip,
//! and fields are evaluated in declared order so the error list is
//! deterministic for a given input and field list.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::fields::{FieldKind, FieldSpec};

/// Owner attribution used when the caller omits `owner`.
pub const DEFAULT_OWNER: &str = "user";

/// One rejected field: which one and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
  pub field: String,
  pub message: String,
}

/// Aggregated validation failure; never empty, never a partial success.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation failed for {} field(s)", .errors.len())]
pub struct CollectedValidationError {
  pub errors: Vec<ValidationError>,
}

/// Validated parameters keyed by field name; always contains `owner`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBag {
  values: Map<String, Value>,
}

impl ParameterBag {
  pub fn get(&self, name: &str) -> Option<&Value> {
    self.values.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  /// The owner attribution, always present.
  pub fn owner(&self) -> &str {
    self
      .values
      .get("owner")
      .and_then(Value::as_str)
      .unwrap_or(DEFAULT_OWNER)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.values.iter()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// Produce a new parameter map with `owner` defaulted to [`DEFAULT_OWNER`]
/// when absent. Caller-supplied input is never mutated in place.
pub fn with_default_owner(raw: &Map<String, Value>) -> Map<String, Value> {
  let mut args = raw.clone();
  args
    .entry("owner")
    .or_insert_with(|| Value::from(DEFAULT_OWNER));
  args
}

/// Validate a raw parameter map against the ordered field specs.
///
/// Unknown keys in `raw` are ignored for forward compatibility; `owner` is
/// not a declared field and is always carried into the bag (defaulted when
/// absent).
pub fn validate_params(
  fields: &[FieldSpec],
  raw: &Map<String, Value>,
) -> Result<ParameterBag, CollectedValidationError> {
  let mut values = Map::new();
  let mut errors = Vec::new();

  for field in fields {
    validate_into(field, "", raw.get(&field.name), &mut values, &mut errors);
  }

  if !errors.is_empty() {
    return Err(CollectedValidationError { errors });
  }

  values.insert(
    "owner".to_string(),
    raw
      .get("owner")
      .cloned()
      .unwrap_or_else(|| Value::from(DEFAULT_OWNER)),
  );
  Ok(ParameterBag { values })
}

fn full_name(prefix: &str, name: &str) -> String {
  if prefix.is_empty() {
    name.to_string()
  } else {
    format!("{}.{}", prefix, name)
  }
}

fn validate_into(
  field: &FieldSpec,
  prefix: &str,
  raw: Option<&Value>,
  out: &mut Map<String, Value>,
  errors: &mut Vec<ValidationError>,
) {
  let full = full_name(prefix, &field.name);

  let Some(value) = raw else {
    if let Some(default) = &field.default {
      out.insert(field.name.clone(), default.clone());
    } else if field.required {
      errors.push(ValidationError {
        field: full.clone(),
        message: format!("{} is required", full),
      });
    }
    return;
  };

  if let FieldKind::Nested { fields } = &field.kind {
    let Some(obj) = value.as_object() else {
      errors.push(ValidationError {
        field: full.clone(),
        message: format!("{}: must be a mapping", full),
      });
      return;
    };
    let mut nested = Map::new();
    for sub in fields {
      validate_into(sub, &full, obj.get(&sub.name), &mut nested, errors);
    }
    out.insert(field.name.clone(), Value::Object(nested));
    return;
  }

  match field.kind.check(value) {
    Ok(accepted) => {
      out.insert(field.name.clone(), accepted);
    }
    Err(reason) => errors.push(ValidationError {
      field: full.clone(),
      message: format!("{}: {}", full, reason),
    }),
  }
}
