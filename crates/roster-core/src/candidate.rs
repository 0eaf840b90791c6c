//! Candidate profiles, as read from the identity/profile collaborator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::Seniority;

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
pub enum Availability {
  Available,
  #[default]
  InQualification,
  Paused,
  Unavailable,
}

impl Availability {
  pub fn is_available(self) -> bool { matches!(self, Self::Available) }
}

/// A candidate and the skills they hold.
///
/// `role_id` and `seniority` are optional because onboarding may still be
/// incomplete. A profile missing either is never eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
  pub candidate_id: Uuid,
  pub role_id:      Option<Uuid>,
  pub seniority:    Option<Seniority>,
  pub availability: Availability,
  #[serde(default)]
  pub languages:    BTreeSet<Uuid>,
  #[serde(default)]
  pub expertises:   BTreeSet<Uuid>,
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::upsert_candidate`]. Replaces the
/// stored profile and both membership sets.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateUpsert {
  pub role_id:      Option<Uuid>,
  pub seniority:    Option<Seniority>,
  #[serde(default)]
  pub availability: Availability,
  #[serde(default)]
  pub languages:    BTreeSet<Uuid>,
  #[serde(default)]
  pub expertises:   BTreeSet<Uuid>,
}
