//! [`BookingEngine`]: the operations the core exposes to its collaborators.

use std::{collections::BTreeSet, sync::Arc};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  BookingError, Entity, Outcome,
  assignment::ResourceAssignment,
  booking::{Transition, TransitionReceipt},
  matching::{self, MatchNotification},
  store::RosterStore,
  visibility,
};

/// Booking and matching operations over a [`RosterStore`].
///
/// Cloning is cheap; the store is shared.
pub struct BookingEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for BookingEngine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

/// One matching pass over an assignment.
#[derive(Debug, Clone, Default)]
pub struct FanoutResult {
  /// Every currently eligible candidate.
  pub eligible: BTreeSet<Uuid>,
  /// Notifications created by this pass; earlier ones are not repeated.
  /// Delivery happens later, in [`crate::fanout::FanoutDriver`].
  pub created:  Vec<MatchNotification>,
}

impl<S: RosterStore> BookingEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ── Transitions ───────────────────────────────────────────────────────

  /// `draft → searching`, or straight to `accepted` for an automated role.
  pub async fn open(
    &self,
    assignment_id: Uuid,
  ) -> Result<Outcome<TransitionReceipt>, S::Error> {
    self.transition(assignment_id, Transition::Open).await
  }

  /// `searching → accepted` for an eligible candidate. Exactly one of any
  /// number of concurrent accepts succeeds; the rest see `Conflict`.
  pub async fn accept(
    &self,
    assignment_id: Uuid,
    candidate_id: Uuid,
  ) -> Result<Outcome<TransitionReceipt>, S::Error> {
    self
      .transition(assignment_id, Transition::Accept { candidate_id })
      .await
  }

  /// Holder gives the slot back; it reopens to `searching`.
  pub async fn decline(
    &self,
    assignment_id: Uuid,
    candidate_id: Uuid,
  ) -> Result<Outcome<TransitionReceipt>, S::Error> {
    self
      .transition(assignment_id, Transition::Decline { candidate_id })
      .await
  }

  /// Project owner cancels an accepted booking; it reopens to `searching`.
  pub async fn withdraw(
    &self,
    assignment_id: Uuid,
  ) -> Result<Outcome<TransitionReceipt>, S::Error> {
    self.transition(assignment_id, Transition::Withdraw).await
  }

  async fn transition(
    &self,
    assignment_id: Uuid,
    transition: Transition,
  ) -> Result<Outcome<TransitionReceipt>, S::Error> {
    let outcome = self.store.apply_transition(assignment_id, transition).await?;
    match &outcome {
      Ok(receipt) => info!(
        %assignment_id,
        transition = %transition.kind(),
        status = %receipt.assignment.booking_status,
        candidate_id = ?receipt.assignment.candidate_id,
        changed = receipt.event.is_some(),
        "booking transition applied"
      ),
      Err(e) => debug!(
        %assignment_id,
        transition = %transition.kind(),
        code = e.code(),
        "booking transition rejected: {e}"
      ),
    }
    Ok(outcome)
  }

  // ── Matching ──────────────────────────────────────────────────────────

  /// Ids of every candidate currently eligible for the assignment, recording
  /// a notification for each one not yet notified.
  pub async fn find_eligible_candidates(
    &self,
    assignment_id: Uuid,
  ) -> Result<Outcome<BTreeSet<Uuid>>, S::Error> {
    Ok(self.fan_out(assignment_id).await?.map(|r| r.eligible))
  }

  /// Run the Matching Index for one assignment. Safe to repeat; it never
  /// touches the assignment itself.
  pub async fn fan_out(
    &self,
    assignment_id: Uuid,
  ) -> Result<Outcome<FanoutResult>, S::Error> {
    let Some(assignment) = self.store.get_assignment(assignment_id).await? else {
      return Ok(Err(BookingError::NotFound(Entity::Assignment, assignment_id)));
    };
    if !assignment.is_searching() {
      return Ok(Ok(FanoutResult::default()));
    }

    let population = self
      .store
      .prefiltered_candidates(assignment.role_id, assignment.required_seniority)
      .await?;
    let eligible = matching::eligible_candidates(&assignment, &population);

    let created = if eligible.is_empty() {
      Vec::new()
    } else {
      self
        .store
        .record_notifications(assignment_id, eligible.iter().copied().collect())
        .await?
    };

    debug!(
      %assignment_id,
      considered = population.len(),
      eligible = eligible.len(),
      created = created.len(),
      "matching pass"
    );
    Ok(Ok(FanoutResult { eligible, created }))
  }

  // ── Visibility ────────────────────────────────────────────────────────

  /// What the candidate's dashboard may show right now.
  pub async fn visible_assignments(
    &self,
    candidate_id: Uuid,
  ) -> Result<Outcome<Vec<ResourceAssignment>>, S::Error> {
    let Some(candidate) = self.store.get_candidate(candidate_id).await? else {
      return Ok(Err(BookingError::NotFound(Entity::Candidate, candidate_id)));
    };

    let held = self.store.assignments_held_by(candidate_id).await?;
    let open = match (candidate.role_id, candidate.seniority) {
      (Some(role_id), Some(seniority)) => {
        self.store.searching_assignments(role_id, seniority).await?
      }
      _ => Vec::new(),
    };

    Ok(Ok(visibility::visible_assignments(&candidate, held, open)))
  }
}
