//! Resource assignments: one staffing slot on a project.
//!
//! An assignment's `booking_status` and `candidate_id` change only through the
//! transitions in [`crate::booking`]. Nothing else in the workspace writes
//! those two fields.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::Seniority;

/// Occupation state of a resource assignment.
///
/// `Declined` annotates a single candidate's attempt in the booking history;
/// the slot itself goes straight back to `Searching`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
  Draft,
  Searching,
  Accepted,
  Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAssignment {
  pub assignment_id:       Uuid,
  pub project_id:          Uuid,
  pub role_id:             Uuid,
  pub required_seniority:  Seniority,
  /// Language ids the occupant must speak; empty means unconstrained.
  pub required_languages:  BTreeSet<Uuid>,
  /// Expertise ids the occupant must hold; empty means unconstrained.
  pub required_expertises: BTreeSet<Uuid>,
  pub booking_status:      BookingStatus,
  /// The candidate currently holding the slot. `None` unless `Accepted`.
  pub candidate_id:        Option<Uuid>,
  /// Computed upstream; irrelevant to matching.
  pub price_cents:         Option<i64>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl ResourceAssignment {
  pub fn is_searching(&self) -> bool {
    self.booking_status == BookingStatus::Searching
  }

  pub fn is_held_by(&self, candidate_id: Uuid) -> bool {
    self.candidate_id == Some(candidate_id)
  }
}

/// Input to [`crate::store::RosterStore::add_assignment`]. New assignments are
/// always created in `Draft` with no candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
  pub project_id:          Uuid,
  pub role_id:             Uuid,
  pub required_seniority:  Seniority,
  #[serde(default)]
  pub required_languages:  BTreeSet<Uuid>,
  #[serde(default)]
  pub required_expertises: BTreeSet<Uuid>,
  pub price_cents:         Option<i64>,
}
