//! Kiln Store
//!
//! This crate provides the storage trait and implementations for builds,
//! buildsets, builders and their properties. Data is persisted to SQLite;
//! an in-memory implementation backs tests and local runs.
//!
//! The [`Store`] trait defines operations for:
//! - Looking up builders, builds, buildsets and sourcestamps
//! - Reading and writing provenance-tagged properties
//! - Creating buildsets (used by the force-trigger mechanism)

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{Build, Builder, Buildset, SourceStamp};

use async_trait::async_trait;
use kiln_properties::PropertySet;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for builds, buildsets and their properties.
///
/// Property writes are last-write-wins per `(owner, name)` key; a key is
/// unique within its owning build or buildset.
#[async_trait]
pub trait Store: Send + Sync {
  /// Get a builder by ID.
  async fn get_builder(&self, builder_id: i64) -> Result<Builder, Error>;

  /// Get a build by ID.
  async fn get_build(&self, build_id: i64) -> Result<Build, Error>;

  /// Get a buildset by ID.
  async fn get_buildset(&self, buildset_id: i64) -> Result<Buildset, Error>;

  /// List the sourcestamps of a buildset, in insertion order.
  async fn get_buildset_sourcestamps(&self, buildset_id: i64) -> Result<Vec<SourceStamp>, Error>;

  /// Read all properties owned by a build.
  async fn get_build_properties(&self, build_id: i64) -> Result<PropertySet, Error>;

  /// Upsert a single build property, overwriting value and source.
  async fn set_build_property(
    &self,
    build_id: i64,
    name: &str,
    value: &serde_json::Value,
    source: &str,
  ) -> Result<(), Error>;

  /// Read all properties owned by a buildset.
  async fn get_buildset_properties(&self, buildset_id: i64) -> Result<PropertySet, Error>;

  /// Create a new buildset with its initial properties, returning its ID.
  async fn create_buildset(&self, reason: &str, properties: &PropertySet) -> Result<i64, Error>;
}
