use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use kiln_properties::PropertySet;

use crate::{Build, Builder, Buildset, Error, SourceStamp, Store};

/// In-memory store implementation.
///
/// Backs tests and local one-shot runs; state is lost on drop. The inherent
/// `insert_*` helpers seed fixture data that the [`Store`] trait itself has
/// no reason to expose.
#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
  builders: BTreeMap<i64, Builder>,
  builds: BTreeMap<i64, Build>,
  buildsets: BTreeMap<i64, Buildset>,
  sourcestamps: BTreeMap<i64, Vec<SourceStamp>>,
  build_properties: BTreeMap<i64, PropertySet>,
  buildset_properties: BTreeMap<i64, PropertySet>,
  next_id: i64,
}

impl Inner {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a builder, returning its ID.
  pub fn insert_builder(&self, name: &str) -> i64 {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id();
    inner.builders.insert(
      id,
      Builder {
        id,
        name: name.to_string(),
      },
    );
    id
  }

  /// Insert a buildset with the given reason, returning its ID.
  pub fn insert_buildset(&self, reason: &str) -> i64 {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id();
    inner.buildsets.insert(
      id,
      Buildset {
        id,
        reason: reason.to_string(),
        created_at: Utc::now(),
      },
    );
    id
  }

  /// Insert a build for an existing builder and buildset, returning its ID.
  pub fn insert_build(&self, builder_id: i64, buildset_id: i64) -> i64 {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id();
    let number = inner
      .builds
      .values()
      .filter(|b| b.builder_id == builder_id)
      .count() as i64
      + 1;
    inner.builds.insert(
      id,
      Build {
        id,
        builder_id,
        buildset_id,
        number,
        started_at: Utc::now(),
      },
    );
    id
  }

  /// Attach a sourcestamp to a buildset.
  pub fn insert_sourcestamp(&self, buildset_id: i64, stamp: SourceStamp) {
    let mut inner = self.inner.lock().unwrap();
    inner.sourcestamps.entry(buildset_id).or_default().push(stamp);
  }

  /// Seed a buildset property directly.
  pub fn insert_buildset_property(
    &self,
    buildset_id: i64,
    name: &str,
    value: serde_json::Value,
    source: &str,
  ) {
    let mut inner = self.inner.lock().unwrap();
    inner
      .buildset_properties
      .entry(buildset_id)
      .or_default()
      .set(name, value, source);
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get_builder(&self, builder_id: i64) -> Result<Builder, Error> {
    let inner = self.inner.lock().unwrap();
    inner
      .builders
      .get(&builder_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("builder {}", builder_id)))
  }

  async fn get_build(&self, build_id: i64) -> Result<Build, Error> {
    let inner = self.inner.lock().unwrap();
    inner
      .builds
      .get(&build_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("build {}", build_id)))
  }

  async fn get_buildset(&self, buildset_id: i64) -> Result<Buildset, Error> {
    let inner = self.inner.lock().unwrap();
    inner
      .buildsets
      .get(&buildset_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("buildset {}", buildset_id)))
  }

  async fn get_buildset_sourcestamps(&self, buildset_id: i64) -> Result<Vec<SourceStamp>, Error> {
    let inner = self.inner.lock().unwrap();
    Ok(inner.sourcestamps.get(&buildset_id).cloned().unwrap_or_default())
  }

  async fn get_build_properties(&self, build_id: i64) -> Result<PropertySet, Error> {
    let inner = self.inner.lock().unwrap();
    Ok(inner.build_properties.get(&build_id).cloned().unwrap_or_default())
  }

  async fn set_build_property(
    &self,
    build_id: i64,
    name: &str,
    value: &serde_json::Value,
    source: &str,
  ) -> Result<(), Error> {
    let mut inner = self.inner.lock().unwrap();
    inner
      .build_properties
      .entry(build_id)
      .or_default()
      .set(name, value.clone(), source);
    Ok(())
  }

  async fn get_buildset_properties(&self, buildset_id: i64) -> Result<PropertySet, Error> {
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .buildset_properties
        .get(&buildset_id)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn create_buildset(&self, reason: &str, properties: &PropertySet) -> Result<i64, Error> {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id();
    inner.buildsets.insert(
      id,
      Buildset {
        id,
        reason: reason.to_string(),
        created_at: Utc::now(),
      },
    );
    inner.buildset_properties.insert(id, properties.clone());
    Ok(id)
  }
}
