use kiln_scheduler::{CollectedValidationError, ForceError, TriggerError};

use crate::rpc::{self, RpcError};

/// Error type for data-plane operations.
///
/// "Definition not found" is not part of this taxonomy: read operations
/// return `None` for names that do not resolve, since a client polling a
/// list sees that as a normal state, not a bad request.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
  /// One or more fields failed validation; carries the complete error set.
  #[error(transparent)]
  InvalidParams(#[from] CollectedValidationError),

  /// A storage read or write failed. Not retried here; re-synchronization
  /// is always safe for the caller.
  #[error(transparent)]
  Storage(#[from] kiln_store::Error),

  /// An event publish failed after any storage writes already succeeded.
  #[error(transparent)]
  Publish(#[from] kiln_mq::PublishError),

  /// The trigger mechanism failed to create the unit of work.
  #[error(transparent)]
  Mechanism(#[from] TriggerError),

  /// A wire value could not be serialized.
  #[error("serialization error: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl From<ForceError> for DataError {
  fn from(err: ForceError) -> Self {
    match err {
      ForceError::Validation(collected) => DataError::InvalidParams(collected),
      ForceError::Mechanism(trigger) => DataError::Mechanism(trigger),
    }
  }
}

impl DataError {
  /// Render as the client-facing JSON-RPC error object.
  ///
  /// Validation failures always map to [`rpc::INVALID_PARAMS`] with the
  /// field-by-field error list as `data`; everything else is an internal
  /// error with a plain message, never a stack trace.
  pub fn to_rpc(&self) -> RpcError {
    match self {
      DataError::InvalidParams(collected) => {
        let data = serde_json::to_value(&collected.errors)
          .unwrap_or(serde_json::Value::Null);
        RpcError::new(rpc::INVALID_PARAMS, "invalid parameters").with_data(data)
      }
      other => RpcError::new(rpc::INTERNAL_ERROR, other.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kiln_scheduler::ValidationError;
  use serde_json::json;

  #[test]
  fn validation_failure_renders_stable_code_and_data() {
    let err = DataError::InvalidParams(CollectedValidationError {
      errors: vec![ValidationError {
        field: "reason".into(),
        message: "reason is required".into(),
      }],
    });

    let rpc_err = err.to_rpc();
    assert_eq!(rpc_err.code, -32602);

    let wire = serde_json::to_value(&rpc_err).unwrap();
    assert_eq!(
      wire,
      json!({
        "code": -32602,
        "message": "invalid parameters",
        "data": [{"field": "reason", "message": "reason is required"}],
      })
    );
  }

  #[test]
  fn storage_failure_renders_internal_error_without_data() {
    let err = DataError::Storage(kiln_store::Error::NotFound("build 7".into()));
    let rpc_err = err.to_rpc();
    assert_eq!(rpc_err.code, -32603);

    let wire = serde_json::to_value(&rpc_err).unwrap();
    assert!(wire.get("data").is_none());
  }
}
