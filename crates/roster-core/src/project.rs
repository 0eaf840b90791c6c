//! Projects: the owners of resource assignments.
//!
//! Project lifecycle actions live outside this crate; the core only reads the
//! record so intake can refuse assignments for unknown projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Draft,
  Paused,
  AwaitingTeam,
  Active,
  Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub project_id: Uuid,
  /// The client account that created the project.
  pub owner_id:   Uuid,
  pub status:     ProjectStatus,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::add_project`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub owner_id: Uuid,
  #[serde(default)]
  pub status:   ProjectStatus,
}
