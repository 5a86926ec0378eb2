//! Property read endpoints and the store synchronizer.
//!
//! The in-memory property set held by the agent driving a build is the
//! desired state; storage is a mirror. [`Properties::set_build_properties`]
//! reconciles the two: it writes only the keys whose `(value, source)` pair
//! diverged from the stored copy and publishes that changed subset as a
//! single event. Repeated synchronization with identical input is a complete
//! no-op at the storage and bus boundary.

use std::sync::Arc;

use kiln_mq::EventBus;
use kiln_properties::PropertySet;
use kiln_store::{SourceStamp, Store};

use crate::error::DataError;

/// Provenance recorded on properties inherited from sourcestamps.
const SOURCESTAMP_SOURCE: &str = "Sourcestamp";

pub struct Properties {
  store: Arc<dyn Store>,
  bus: Arc<dyn EventBus>,
}

impl Properties {
  pub fn new(store: Arc<dyn Store>, bus: Arc<dyn EventBus>) -> Self {
    Self { store, bus }
  }

  /// Read a build's properties: the stored build-owned set merged over the
  /// read-only properties derived from its buildset's sourcestamps.
  ///
  /// Build-owned values win on key collision; descriptors are applied in
  /// insertion order. Backs `GET /builds/{id}/properties` and the nested
  /// `GET /builders/{builderId}/builds/{id}/properties` path.
  pub async fn build_properties(&self, build_id: i64) -> Result<PropertySet, DataError> {
    let build = self.store.get_build(build_id).await?;
    let stamps = self.store.get_buildset_sourcestamps(build.buildset_id).await?;

    let mut props = PropertySet::new();
    for stamp in &stamps {
      merge_sourcestamp(&mut props, stamp);
    }
    props.extend(self.store.get_build_properties(build_id).await?);
    Ok(props)
  }

  /// Read a buildset's stored properties. Backs
  /// `GET /buildsets/{id}/properties`.
  pub async fn buildset_properties(&self, buildset_id: i64) -> Result<PropertySet, DataError> {
    Ok(self.store.get_buildset_properties(buildset_id).await?)
  }

  /// Direct passthrough single-property write, for callers that already
  /// know the write is necessary.
  pub async fn set_build_property(
    &self,
    build_id: i64,
    name: &str,
    value: &serde_json::Value,
    source: &str,
  ) -> Result<(), DataError> {
    self
      .store
      .set_build_property(build_id, name, value, source)
      .await?;
    Ok(())
  }

  /// Synchronize a build's desired property set to storage.
  ///
  /// Keys whose `(value, source)` pair matches the stored copy are skipped;
  /// if nothing differs, no storage write occurs and no event is published.
  /// Differing keys are written sequentially, each write awaited before the
  /// next, then the changed subset is published once under
  /// `builds/{id}/properties/update`.
  ///
  /// Not atomic across keys: a failed write fails the whole call with no
  /// rollback. Re-running with the same desired state converges, since
  /// already-written keys no longer differ.
  pub async fn set_build_properties(
    &self,
    build_id: i64,
    desired: &PropertySet,
  ) -> Result<(), DataError> {
    let stored = self.store.get_build_properties(build_id).await?;
    let changed = desired.diff(&stored);
    if changed.is_empty() {
      return Ok(());
    }

    for (name, prop) in changed.iter() {
      self
        .store
        .set_build_property(build_id, name, &prop.value, &prop.source)
        .await?;
    }

    tracing::debug!(build_id, changed = changed.len(), "build properties synchronized");

    let id = build_id.to_string();
    self
      .bus
      .publish(
        &["builds", &id, "properties", "update"],
        serde_json::to_value(&changed)?,
      )
      .await?;
    Ok(())
  }
}

fn merge_sourcestamp(props: &mut PropertySet, stamp: &SourceStamp) {
  if let Some(branch) = &stamp.branch {
    props.set("branch", branch.as_str(), SOURCESTAMP_SOURCE);
  }
  if let Some(revision) = &stamp.revision {
    props.set("revision", revision.as_str(), SOURCESTAMP_SOURCE);
  }
  props.set("repository", stamp.repository.as_str(), SOURCESTAMP_SOURCE);
  props.set("project", stamp.project.as_str(), SOURCESTAMP_SOURCE);
  props.set("codebase", stamp.codebase.as_str(), SOURCESTAMP_SOURCE);
}
