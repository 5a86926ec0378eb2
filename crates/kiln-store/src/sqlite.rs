use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use kiln_properties::{Property, PropertySet};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::types::Json;
use sqlx::{FromRow, Row};

use crate::{Build, Builder, Buildset, Error, SourceStamp, Store};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

/// Property row as stored; values are JSON text columns.
#[derive(FromRow)]
struct PropertyRow {
  name: String,
  value: Json<serde_json::Value>,
  source: String,
}

fn rows_to_property_set(rows: Vec<PropertyRow>) -> PropertySet {
  rows
    .into_iter()
    .map(|row| (row.name, Property::new(row.value.0, row.source)))
    .collect()
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) a database file and run migrations.
  pub async fn open(path: &Path) -> Result<Self, Error> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(sqlx::Error::from)
  }

  /// Insert a builder, returning its ID.
  pub async fn insert_builder(&self, name: &str) -> Result<i64, Error> {
    let result = sqlx::query("INSERT INTO builders (name) VALUES (?)")
      .bind(name)
      .execute(&self.pool)
      .await?;
    Ok(result.last_insert_rowid())
  }

  /// Insert a build for an existing builder and buildset, returning its ID.
  pub async fn insert_build(&self, builder_id: i64, buildset_id: i64) -> Result<i64, Error> {
    let number: i64 =
      sqlx::query("SELECT COUNT(*) AS n FROM builds WHERE builder_id = ?")
        .bind(builder_id)
        .fetch_one(&self.pool)
        .await?
        .get::<i64, _>("n")
        + 1;

    let result = sqlx::query(
      r#"
            INSERT INTO builds (builder_id, buildset_id, number, started_at)
            VALUES (?, ?, ?, ?)
            "#,
    )
    .bind(builder_id)
    .bind(buildset_id)
    .bind(number)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    Ok(result.last_insert_rowid())
  }

  /// Attach a sourcestamp to a buildset.
  pub async fn insert_sourcestamp(
    &self,
    buildset_id: i64,
    stamp: &SourceStamp,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO sourcestamps (buildset_id, codebase, branch, revision, repository, project)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(buildset_id)
    .bind(&stamp.codebase)
    .bind(&stamp.branch)
    .bind(&stamp.revision)
    .bind(&stamp.repository)
    .bind(&stamp.project)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn get_builder(&self, builder_id: i64) -> Result<Builder, Error> {
    sqlx::query_as("SELECT id, name FROM builders WHERE id = ?")
      .bind(builder_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| Error::NotFound(format!("builder {}", builder_id)))
  }

  async fn get_build(&self, build_id: i64) -> Result<Build, Error> {
    sqlx::query_as(
      r#"
            SELECT id, builder_id, buildset_id, number, started_at
            FROM builds
            WHERE id = ?
            "#,
    )
    .bind(build_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("build {}", build_id)))
  }

  async fn get_buildset(&self, buildset_id: i64) -> Result<Buildset, Error> {
    sqlx::query_as("SELECT id, reason, created_at FROM buildsets WHERE id = ?")
      .bind(buildset_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| Error::NotFound(format!("buildset {}", buildset_id)))
  }

  async fn get_buildset_sourcestamps(&self, buildset_id: i64) -> Result<Vec<SourceStamp>, Error> {
    let stamps = sqlx::query_as(
      r#"
            SELECT codebase, branch, revision, repository, project
            FROM sourcestamps
            WHERE buildset_id = ?
            ORDER BY id ASC
            "#,
    )
    .bind(buildset_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(stamps)
  }

  async fn get_build_properties(&self, build_id: i64) -> Result<PropertySet, Error> {
    let rows: Vec<PropertyRow> = sqlx::query_as(
      r#"
            SELECT name, value, source
            FROM build_properties
            WHERE build_id = ?
            "#,
    )
    .bind(build_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows_to_property_set(rows))
  }

  async fn set_build_property(
    &self,
    build_id: i64,
    name: &str,
    value: &serde_json::Value,
    source: &str,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO build_properties (build_id, name, value, source)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (build_id, name)
            DO UPDATE SET value = excluded.value, source = excluded.source
            "#,
    )
    .bind(build_id)
    .bind(name)
    .bind(Json(value))
    .bind(source)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn get_buildset_properties(&self, buildset_id: i64) -> Result<PropertySet, Error> {
    let rows: Vec<PropertyRow> = sqlx::query_as(
      r#"
            SELECT name, value, source
            FROM buildset_properties
            WHERE buildset_id = ?
            "#,
    )
    .bind(buildset_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows_to_property_set(rows))
  }

  async fn create_buildset(&self, reason: &str, properties: &PropertySet) -> Result<i64, Error> {
    // the buildset row and its properties land together or not at all
    let mut tx = self.pool.begin().await?;

    let result = sqlx::query("INSERT INTO buildsets (reason, created_at) VALUES (?, ?)")
      .bind(reason)
      .bind(Utc::now())
      .execute(&mut *tx)
      .await?;
    let buildset_id = result.last_insert_rowid();

    for (name, prop) in properties.iter() {
      sqlx::query(
        r#"
                INSERT INTO buildset_properties (buildset_id, name, value, source)
                VALUES (?, ?, ?, ?)
                "#,
      )
      .bind(buildset_id)
      .bind(name)
      .bind(Json(&prop.value))
      .bind(&prop.source)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(buildset_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  async fn store(dir: &tempfile::TempDir) -> SqliteStore {
    SqliteStore::open(&dir.path().join("kiln.db"))
      .await
      .expect("failed to open database")
  }

  #[tokio::test]
  async fn lookups_report_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    assert!(matches!(
      store.get_build(786).await,
      Err(Error::NotFound(_))
    ));
    assert!(matches!(
      store.get_builder(1).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn build_property_upsert_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let buildset_id = store.create_buildset("test", &PropertySet::new()).await.unwrap();
    let builder_id = store.insert_builder("runtests").await.unwrap();
    let build_id = store.insert_build(builder_id, buildset_id).await.unwrap();

    store
      .set_build_property(build_id, "year", &json!(1651), "Wikipedia")
      .await
      .unwrap();
    store
      .set_build_property(build_id, "island_name", &json!("despair"), "Book")
      .await
      .unwrap();
    store
      .set_build_property(build_id, "year", &json!(1652), "Errata")
      .await
      .unwrap();

    let props = store.get_build_properties(build_id).await.unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(props.get("year").unwrap().value, json!(1652));
    assert_eq!(props.get("year").unwrap().source, "Errata");
    assert_eq!(props.get("island_name").unwrap().value, json!("despair"));
  }

  #[tokio::test]
  async fn nested_values_round_trip_through_json_column() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let buildset_id = store.create_buildset("test", &PropertySet::new()).await.unwrap();
    let builder_id = store.insert_builder("runtests").await.unwrap();
    let build_id = store.insert_build(builder_id, buildset_id).await.unwrap();

    let value = json!({"files": ["a.c", "b.c"], "count": 2});
    store
      .set_build_property(build_id, "changes", &value, "scheduler")
      .await
      .unwrap();

    let props = store.get_build_properties(build_id).await.unwrap();
    assert_eq!(props.get("changes").unwrap().value, value);
  }

  #[tokio::test]
  async fn create_buildset_persists_properties_and_stamps() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let mut props = PropertySet::new();
    props.set("owner", "alice", "Force Build Form");
    props.set("branch", "main", "Force Build Form");

    let buildset_id = store.create_buildset("forced build", &props).await.unwrap();
    let buildset = store.get_buildset(buildset_id).await.unwrap();
    assert_eq!(buildset.reason, "forced build");

    store
      .insert_sourcestamp(
        buildset_id,
        &SourceStamp {
          codebase: String::new(),
          branch: Some("main".into()),
          revision: Some("abc123".into()),
          repository: "https://example.com/repo.git".into(),
          project: "kiln".into(),
        },
      )
      .await
      .unwrap();

    let stored = store.get_buildset_properties(buildset_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored.get("owner").unwrap().value, json!("alice"));

    let stamps = store.get_buildset_sourcestamps(buildset_id).await.unwrap();
    assert_eq!(stamps.len(), 1);
    assert_eq!(stamps[0].revision.as_deref(), Some("abc123"));
  }

  #[tokio::test]
  async fn create_buildset_rolls_back_when_a_property_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;

    // make the property inserts fail mid-call
    sqlx::query("DROP TABLE buildset_properties")
      .execute(&store.pool)
      .await
      .unwrap();

    let mut props = PropertySet::new();
    props.set("owner", "alice", "Force Build Form");
    assert!(store.create_buildset("forced build", &props).await.is_err());

    // no half-created buildset left behind
    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM buildsets")
      .fetch_one(&store.pool)
      .await
      .unwrap()
      .get("n");
    assert_eq!(count, 0);
  }
}
