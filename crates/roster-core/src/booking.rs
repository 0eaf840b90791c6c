//! Booking State Machine: the transition rules for one assignment.
//!
//! ```text
//! draft ──open──▶ searching ──accept──▶ accepted
//!   │                ▲                     │
//!   │                └──decline/withdraw───┘
//!   └──open (automated role)──────────────▶ accepted
//! ```
//!
//! [`plan`] is pure: it inspects a snapshot and either rejects the transition
//! or describes the single conditional write that applies it. Storage
//! backends run the snapshot read, [`plan`] and that write inside one atomic
//! unit, and key the write on the snapshot's `(booking_status, candidate_id)`
//! so a concurrent change turns into [`BookingError::Conflict`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  assignment::{BookingStatus, ResourceAssignment},
  candidate::CandidateProfile,
  eligibility,
  error::{BookingError, Entity, Outcome},
  registry::Role,
};

/// A requested change to an assignment's booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Client opens a draft slot to candidates.
  Open,
  /// Candidate claims a searching slot.
  Accept { candidate_id: Uuid },
  /// Holder gives the slot back.
  Decline { candidate_id: Uuid },
  /// Project owner cancels an accepted booking.
  Withdraw,
}

/// Discriminant recorded in the booking history.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitionKind {
  Open,
  Accept,
  /// `Open` on an automated role, booked in the same step.
  AutoAccept,
  Decline,
  Withdraw,
}

impl Transition {
  pub fn kind(&self) -> TransitionKind {
    match self {
      Self::Open => TransitionKind::Open,
      Self::Accept { .. } => TransitionKind::Accept,
      Self::Decline { .. } => TransitionKind::Decline,
      Self::Withdraw => TransitionKind::Withdraw,
    }
  }

  /// The identity that would hold the slot if this transition succeeded.
  ///
  /// Backends use it to fill [`TransitionContext::occupied`] before planning.
  pub fn occupant(&self, role: Option<&Role>) -> Option<Uuid> {
    match self {
      Self::Accept { candidate_id } => Some(*candidate_id),
      Self::Open => role.filter(|r| r.automated).map(|r| r.role_id),
      Self::Decline { .. } | Self::Withdraw => None,
    }
  }
}

/// Everything [`plan`] may look at, read inside the same atomic unit as the
/// write that follows.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
  pub assignment: &'a ResourceAssignment,
  pub role:       Option<&'a Role>,
  /// Present only for `Accept`; `None` means no such candidate.
  pub candidate:  Option<&'a CandidateProfile>,
  /// Whether [`Transition::occupant`] already holds another accepted slot
  /// with the same project and role.
  pub occupied:   bool,
}

/// The conditional write that applies a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
  pub kind:           TransitionKind,
  /// Expected current state; the write must not apply if it has moved.
  pub from:           BookingStatus,
  pub from_candidate: Option<Uuid>,
  pub to:             BookingStatus,
  pub to_candidate:   Option<Uuid>,
  /// Status recorded in the history event. Differs from `to` only for a
  /// decline, which the history keeps as `declined`.
  pub recorded:       BookingStatus,
  /// The candidate the history event is about.
  pub subject:        Option<Uuid>,
  /// The slot is open again and eligible candidates must be notified.
  pub fan_out:        bool,
}

/// Result of planning a transition that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
  Apply(Plan),
  /// Re-entrant accept by the current holder; nothing to write.
  Unchanged,
}

/// Decide whether `transition` may apply to the snapshot in `ctx`.
pub fn plan(transition: &Transition, ctx: &TransitionContext<'_>) -> Outcome<Planned> {
  let a = ctx.assignment;
  let from = a.booking_status;
  let invalid = || BookingError::InvalidTransition {
    transition: transition.kind(),
    from,
  };

  let base = Plan {
    kind:           transition.kind(),
    from,
    from_candidate: a.candidate_id,
    to:             from,
    to_candidate:   a.candidate_id,
    recorded:       from,
    subject:        None,
    fan_out:        false,
  };

  match *transition {
    Transition::Open => {
      if from != BookingStatus::Draft {
        return Err(invalid());
      }
      let role = ctx.role.ok_or(BookingError::NotFound(Entity::Role, a.role_id))?;

      if role.automated {
        if ctx.occupied {
          return Err(BookingError::Conflict);
        }
        let to = BookingStatus::Accepted;
        return Ok(Planned::Apply(Plan {
          kind: TransitionKind::AutoAccept,
          to,
          to_candidate: Some(role.role_id),
          recorded: to,
          subject: Some(role.role_id),
          ..base
        }));
      }

      let to = BookingStatus::Searching;
      Ok(Planned::Apply(Plan {
        to,
        to_candidate: None,
        recorded: to,
        fan_out: true,
        ..base
      }))
    }

    Transition::Accept { candidate_id } => {
      match from {
        BookingStatus::Searching if a.candidate_id.is_none() => {}
        BookingStatus::Accepted if a.is_held_by(candidate_id) => {
          return Ok(Planned::Unchanged);
        }
        BookingStatus::Searching | BookingStatus::Accepted => {
          return Err(BookingError::Conflict);
        }
        BookingStatus::Draft | BookingStatus::Declined => return Err(invalid()),
      }

      let candidate = ctx
        .candidate
        .filter(|c| c.candidate_id == candidate_id)
        .ok_or(BookingError::NotFound(Entity::Candidate, candidate_id))?;
      eligibility::evaluate(candidate, a).map_err(BookingError::Ineligible)?;
      if ctx.occupied {
        return Err(BookingError::Conflict);
      }

      let to = BookingStatus::Accepted;
      Ok(Planned::Apply(Plan {
        to,
        to_candidate: Some(candidate_id),
        recorded: to,
        subject: Some(candidate_id),
        ..base
      }))
    }

    Transition::Decline { candidate_id } => {
      if from != BookingStatus::Accepted || !a.is_held_by(candidate_id) {
        return Err(invalid());
      }
      Ok(Planned::Apply(Plan {
        to: BookingStatus::Searching,
        to_candidate: None,
        recorded: BookingStatus::Declined,
        subject: Some(candidate_id),
        fan_out: true,
        ..base
      }))
    }

    Transition::Withdraw => {
      if from != BookingStatus::Accepted {
        return Err(invalid());
      }
      let to = BookingStatus::Searching;
      Ok(Planned::Apply(Plan {
        to,
        to_candidate: None,
        recorded: to,
        subject: a.candidate_id,
        fan_out: true,
        ..base
      }))
    }
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// An append-only record of one applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
  pub event_id:      Uuid,
  pub assignment_id: Uuid,
  pub transition:    TransitionKind,
  pub from:          BookingStatus,
  pub to:            BookingStatus,
  pub candidate_id:  Option<Uuid>,
  pub recorded_at:   DateTime<Utc>,
}

impl BookingEvent {
  pub fn from_plan(assignment_id: Uuid, plan: &Plan, at: DateTime<Utc>) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      assignment_id,
      transition: plan.kind,
      from: plan.from,
      to: plan.recorded,
      candidate_id: plan.subject,
      recorded_at: at,
    }
  }
}

/// What a successful transition returns: the assignment as it now stands and
/// the history event, if anything was written.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReceipt {
  pub assignment: ResourceAssignment,
  pub event:      Option<BookingEvent>,
}
