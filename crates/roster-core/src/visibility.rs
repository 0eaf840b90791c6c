//! Visibility Projector: what a candidate's dashboard may show.
//!
//! Always recomputed from current state; nothing here is cached.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
  assignment::ResourceAssignment, candidate::CandidateProfile, eligibility,
};

/// Union of the candidate's own bookings (any status) and every searching
/// assignment they are eligible for, deduplicated by id.
///
/// `held` and `open` may be over-fetched; each is filtered here. The result
/// is ordered by assignment id.
pub fn visible_assignments(
  candidate: &CandidateProfile,
  held: impl IntoIterator<Item = ResourceAssignment>,
  open: impl IntoIterator<Item = ResourceAssignment>,
) -> Vec<ResourceAssignment> {
  let mut visible: BTreeMap<Uuid, ResourceAssignment> = BTreeMap::new();

  for a in held {
    if a.is_held_by(candidate.candidate_id) {
      visible.insert(a.assignment_id, a);
    }
  }
  for a in open {
    if a.is_searching() && eligibility::is_eligible(candidate, &a) {
      visible.entry(a.assignment_id).or_insert(a);
    }
  }

  visible.into_values().collect()
}
