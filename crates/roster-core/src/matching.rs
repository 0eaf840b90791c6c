//! Matching Index: which candidates may be offered a newly opened slot.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  assignment::ResourceAssignment, candidate::CandidateProfile, eligibility,
};

/// Record that a candidate was found eligible for an assignment. At most one
/// exists per `(candidate_id, assignment_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchNotification {
  pub notification_id: Uuid,
  pub candidate_id:    Uuid,
  pub assignment_id:   Uuid,
  pub created_at:      DateTime<Utc>,
  /// When the notification was handed to the [`crate::fanout::Notifier`].
  pub delivered_at:    Option<DateTime<Utc>>,
}

/// Role and seniority are the cheap equality filters; backends push this part
/// into their candidate query.
pub fn prefilter(candidate: &CandidateProfile, assignment: &ResourceAssignment) -> bool {
  candidate.role_id == Some(assignment.role_id)
    && candidate.seniority == Some(assignment.required_seniority)
}

/// The set of eligible candidate ids among `population`.
///
/// Empty unless the assignment is searching.
pub fn eligible_candidates<'a>(
  assignment: &ResourceAssignment,
  population: impl IntoIterator<Item = &'a CandidateProfile>,
) -> BTreeSet<Uuid> {
  if !assignment.is_searching() {
    return BTreeSet::new();
  }
  population
    .into_iter()
    .filter(|c| prefilter(c, assignment))
    .filter(|c| eligibility::is_eligible(c, assignment))
    .map(|c| c.candidate_id)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    assignment::BookingStatus,
    candidate::Availability,
    eligibility::tests::{assignment, candidate},
    registry::Seniority,
  };

  #[test]
  fn filters_by_role_seniority_skills_and_availability() {
    let role = Uuid::new_v4();
    let english = Uuid::new_v4();
    let mut slot = assignment(role, Seniority::Senior);
    slot.required_languages.insert(english);

    let mut fits = candidate(role, Seniority::Senior);
    fits.languages.insert(english);
    let mut paused = fits.clone();
    paused.candidate_id = Uuid::new_v4();
    paused.availability = Availability::Paused;
    let mut junior = fits.clone();
    junior.candidate_id = Uuid::new_v4();
    junior.seniority = Some(Seniority::Junior);
    let wordless = candidate(role, Seniority::Senior);

    let found = eligible_candidates(&slot, [&fits, &paused, &junior, &wordless]);
    assert_eq!(found, BTreeSet::from([fits.candidate_id]));
  }

  #[test]
  fn nothing_for_slots_that_are_not_searching() {
    let role = Uuid::new_v4();
    let mut slot = assignment(role, Seniority::Junior);
    slot.booking_status = BookingStatus::Draft;
    let c = candidate(role, Seniority::Junior);

    assert!(eligible_candidates(&slot, [&c]).is_empty());
  }
}
