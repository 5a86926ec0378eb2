//! JSON-RPC 2.0 error codes and the wire error object.
//!
//! The numeric codes are fixed by the JSON-RPC 2.0 specification and are
//! stable across versions; clients key on the code, not the message text.

use serde::Serialize;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Client-facing error object: `{code, message, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
  pub code: i64,
  pub message: String,

  #[serde(skip_serializing_if = "serde_json::Value::is_null")]
  pub data: serde_json::Value,
}

impl RpcError {
  pub fn new(code: i64, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
      data: serde_json::Value::Null,
    }
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = data;
    self
  }
}
