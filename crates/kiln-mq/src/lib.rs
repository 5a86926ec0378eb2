//! Kiln MQ
//!
//! The event bus carries change notifications between master components.
//! Producers publish a JSON payload under a routing-key path such as
//! `["builds", "1234", "properties", "update"]`; consumers decide what to do
//! with productions (persist, stream to a UI, log, ignore, etc.).
//!
//! Events are best-effort notifications, not a log of record - storage stays
//! the source of truth for the data they describe.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Error type for bus operations.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
  /// The bus rejected or could not deliver the production.
  #[error("event publish failed: {0}")]
  Failed(String),
}

/// A single published event: routing-key path plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
  pub topic: Vec<String>,
  pub payload: serde_json::Value,
}

/// Trait for publishing events on the bus.
#[async_trait]
pub trait EventBus: Send + Sync {
  /// Publish `payload` under the given routing-key path.
  async fn publish(
    &self,
    topic: &[&str],
    payload: serde_json::Value,
  ) -> Result<(), PublishError>;
}

/// A no-op bus that discards all productions.
///
/// Useful for tests or when event observation is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoopBus;

#[async_trait]
impl EventBus for NoopBus {
  async fn publish(
    &self,
    _topic: &[&str],
    _payload: serde_json::Value,
  ) -> Result<(), PublishError> {
    Ok(())
  }
}

/// A bus that forwards productions to an unbounded channel.
///
/// Unbounded so a slow consumer never blocks the producing task; volume is
/// low (one production per changed-property sync), so memory growth is
/// unlikely in practice.
#[derive(Debug, Clone)]
pub struct ChannelBus {
  sender: mpsc::UnboundedSender<Production>,
}

impl ChannelBus {
  pub fn new(sender: mpsc::UnboundedSender<Production>) -> Self {
    Self { sender }
  }
}

#[async_trait]
impl EventBus for ChannelBus {
  async fn publish(&self, topic: &[&str], payload: serde_json::Value) -> Result<(), PublishError> {
    let production = Production {
      topic: topic.iter().map(|s| s.to_string()).collect(),
      payload,
    };
    // Ignore send errors - the receiver may have been dropped
    let _ = self.sender.send(production);
    Ok(())
  }
}

/// A bus that records every production in memory.
///
/// Test double for asserting exactly which events a component published.
#[derive(Debug, Default)]
pub struct RecordingBus {
  productions: Mutex<Vec<Production>>,
}

impl RecordingBus {
  pub fn new() -> Self {
    Self::default()
  }

  /// All productions published so far, in publish order.
  pub fn productions(&self) -> Vec<Production> {
    self.productions.lock().unwrap().clone()
  }

  /// Drop all recorded productions.
  pub fn clear(&self) {
    self.productions.lock().unwrap().clear();
  }
}

#[async_trait]
impl EventBus for RecordingBus {
  async fn publish(&self, topic: &[&str], payload: serde_json::Value) -> Result<(), PublishError> {
    self.productions.lock().unwrap().push(Production {
      topic: topic.iter().map(|s| s.to_string()).collect(),
      payload,
    });
    Ok(())
  }
}
