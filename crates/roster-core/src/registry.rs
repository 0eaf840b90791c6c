//! Skill/Profile Registry types: roles, seniority levels, languages and
//! expertises.
//!
//! Matching compares these by identifier only. Display names exist for people,
//! never for the eligibility rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job or function type a candidate can be qualified for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub role_id:    Uuid,
  pub name:       String,
  /// An automated (AI) resource. Opening an assignment for such a role books
  /// the role itself as the occupant, without candidate selection.
  pub automated:  bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::add_role`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
  pub name:      String,
  #[serde(default)]
  pub automated: bool,
}

/// Seniority level. Matching requires exact equality.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Seniority {
  Junior,
  Confirmed,
  Senior,
  Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
  pub language_id: Uuid,
  pub name:        String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
  pub expertise_id: Uuid,
  pub name:         String,
}
