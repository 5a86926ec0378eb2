use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A builder registered with the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Builder {
  pub id: i64,
  pub name: String,
}

/// A build as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Build {
  pub id: i64,
  pub builder_id: i64,
  pub buildset_id: i64,
  pub number: i64,
  pub started_at: DateTime<Utc>,
}

/// A buildset: a batch of builds sharing one triggering cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Buildset {
  pub id: i64,
  pub reason: String,
  pub created_at: DateTime<Utc>,
}

/// A source descriptor attached to a buildset (which code is being built).
///
/// Builds inherit read-only properties derived from these descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SourceStamp {
  pub codebase: String,
  pub branch: Option<String>,
  pub revision: Option<String>,
  pub repository: String,
  pub project: String,
}
