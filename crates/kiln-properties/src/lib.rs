//! Kiln Properties
//!
//! Provenance-tagged key/value properties attached to a unit of work (a build
//! or a buildset). Each property carries the value itself plus a free-text
//! `source` string recording which component set it.
//!
//! On the wire a property is a 2-element array `[value, source]`, never an
//! object, and a property set is a mapping `{key: [value, source]}`.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A single property value with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
  /// Any JSON-serializable value, including nested sequences and mappings.
  pub value: serde_json::Value,

  /// Free-text provenance, e.g. which step or scheduler set this property.
  pub source: String,
}

impl Property {
  pub fn new(value: impl Into<serde_json::Value>, source: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      source: source.into(),
    }
  }
}

// Wire format is the pair `[value, source]`.
impl Serialize for Property {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    (&self.value, &self.source).serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Property {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let (value, source) = <(serde_json::Value, String)>::deserialize(deserializer)?;
    Ok(Self { value, source })
  }
}

/// An ordered set of properties for one unit of work.
///
/// Keys are unique within a set; setting an existing key overwrites both the
/// value and the source. Iteration order is the key order, so serialized
/// output and delta events are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet {
  props: BTreeMap<String, Property>,
}

impl PropertySet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set a property, overwriting value and source for an existing key.
  pub fn set(
    &mut self,
    key: impl Into<String>,
    value: impl Into<serde_json::Value>,
    source: impl Into<String>,
  ) {
    self.props.insert(key.into(), Property::new(value, source));
  }

  pub fn get(&self, key: &str) -> Option<&Property> {
    self.props.get(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.props.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.props.len()
  }

  pub fn is_empty(&self) -> bool {
    self.props.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
    self.props.iter()
  }

  /// Merge `other` into `self`, overwriting on key collision.
  pub fn extend(&mut self, other: PropertySet) {
    self.props.extend(other.props);
  }

  /// The subset of `self` whose `(value, source)` pair is absent from or
  /// different in `last_known`.
  ///
  /// This is the synchronizer's delta computation: entries present in
  /// `last_known` but not in `self` are never part of the result, since
  /// properties are only ever added or overwritten, not deleted.
  pub fn diff(&self, last_known: &PropertySet) -> PropertySet {
    let props = self
      .props
      .iter()
      .filter(|&(key, prop)| last_known.props.get(key) != Some(prop))
      .map(|(key, prop)| (key.clone(), prop.clone()))
      .collect();
    PropertySet { props }
  }
}

impl FromIterator<(String, Property)> for PropertySet {
  fn from_iter<I: IntoIterator<Item = (String, Property)>>(iter: I) -> Self {
    Self {
      props: iter.into_iter().collect(),
    }
  }
}

impl IntoIterator for PropertySet {
  type Item = (String, Property);
  type IntoIter = std::collections::btree_map::IntoIter<String, Property>;

  fn into_iter(self) -> Self::IntoIter {
    self.props.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn set_overwrites_value_and_source() {
    let mut props = PropertySet::new();
    props.set("branch", "main", "Sourcestamp");
    props.set("branch", "release", "Force Build Form");

    assert_eq!(props.len(), 1);
    let prop = props.get("branch").unwrap();
    assert_eq!(prop.value, json!("release"));
    assert_eq!(prop.source, "Force Build Form");
  }

  #[test]
  fn wire_encoding_is_a_pair() {
    let mut props = PropertySet::new();
    props.set("year", 1651, "Wikipedia");
    props.set("island_name", "despair", "Book");

    let wire = serde_json::to_value(&props).unwrap();
    assert_eq!(
      wire,
      json!({
        "island_name": ["despair", "Book"],
        "year": [1651, "Wikipedia"],
      })
    );

    let decoded: PropertySet = serde_json::from_value(wire).unwrap();
    assert_eq!(decoded, props);
  }

  #[test]
  fn diff_reports_new_and_changed_keys() {
    let mut known = PropertySet::new();
    known.set("a", 1, "t");
    known.set("b", json!(["abc", 9]), "t");

    let mut desired = known.clone();
    desired.set("b", 2, "step");
    desired.set("c", true, "step");

    let changed = desired.diff(&known);
    assert_eq!(changed.len(), 2);
    assert_eq!(changed.get("b").unwrap().value, json!(2));
    assert_eq!(changed.get("c").unwrap().value, json!(true));
    assert!(!changed.contains_key("a"));
  }

  #[test]
  fn diff_counts_source_only_change() {
    let mut known = PropertySet::new();
    known.set("a", 1, "scheduler");

    let mut desired = PropertySet::new();
    desired.set("a", 1, "step");

    let changed = desired.diff(&known);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed.get("a").unwrap().source, "step");
  }

  #[test]
  fn diff_of_identical_sets_is_empty() {
    let mut props = PropertySet::new();
    props.set("a", 1, "t");
    props.set("b", json!({"nested": [1, 2]}), "t");

    assert!(props.diff(&props.clone()).is_empty());
  }
}
