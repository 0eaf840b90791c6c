//! Candidate Eligibility Evaluator.
//!
//! Decides whether a candidate may occupy a resource assignment. The
//! evaluator is total: incomplete profiles produce a [`Mismatch`], never an
//! error.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  assignment::ResourceAssignment,
  candidate::{Availability, CandidateProfile},
  registry::Seniority,
};

/// The first rule a candidate failed, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Mismatch {
  #[error("profile has no role or seniority yet")]
  IncompleteProfile,

  #[error("role does not match")]
  Role,

  #[error("seniority {actual} does not match required {required}")]
  Seniority {
    required: Seniority,
    actual:   Seniority,
  },

  #[error("missing {} required language(s)", .missing.len())]
  Languages { missing: BTreeSet<Uuid> },

  #[error("missing {} required expertise(s)", .missing.len())]
  Expertises { missing: BTreeSet<Uuid> },

  #[error("candidate is {availability}")]
  NotAvailable { availability: Availability },
}

/// Evaluate every rule and report the first failure.
///
/// Seniority must match exactly; a more senior candidate does not qualify for
/// a junior slot.
pub fn evaluate(
  candidate: &CandidateProfile,
  assignment: &ResourceAssignment,
) -> Result<(), Mismatch> {
  let (Some(role_id), Some(seniority)) =
    (candidate.role_id, candidate.seniority)
  else {
    return Err(Mismatch::IncompleteProfile);
  };

  if role_id != assignment.role_id {
    return Err(Mismatch::Role);
  }
  if seniority != assignment.required_seniority {
    return Err(Mismatch::Seniority {
      required: assignment.required_seniority,
      actual:   seniority,
    });
  }

  let missing = missing_from(&assignment.required_languages, &candidate.languages);
  if !missing.is_empty() {
    return Err(Mismatch::Languages { missing });
  }
  let missing =
    missing_from(&assignment.required_expertises, &candidate.expertises);
  if !missing.is_empty() {
    return Err(Mismatch::Expertises { missing });
  }

  // The current holder keeps seeing their own slot whatever their
  // availability says today.
  if !candidate.availability.is_available()
    && !assignment.is_held_by(candidate.candidate_id)
  {
    return Err(Mismatch::NotAvailable {
      availability: candidate.availability,
    });
  }

  Ok(())
}

/// `true` when [`evaluate`] finds no mismatch.
pub fn is_eligible(
  candidate: &CandidateProfile,
  assignment: &ResourceAssignment,
) -> bool {
  evaluate(candidate, assignment).is_ok()
}

fn missing_from(required: &BTreeSet<Uuid>, held: &BTreeSet<Uuid>) -> BTreeSet<Uuid> {
  required.difference(held).copied().collect()
}
