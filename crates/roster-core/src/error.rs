//! Typed outcomes for `roster-core`: booking rejections and registry
//! name clashes.
//!
//! None of these are faults: a losing `accept` in a race is normal operation.
//! Storage failures never appear here; each backend reports those through its
//! own error type, in the outer layer of [`Outcome`]-returning calls.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  assignment::BookingStatus, booking::TransitionKind, eligibility::Mismatch,
};

/// The kind of record a [`BookingError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Assignment,
  Candidate,
  Project,
  Role,
  Language,
  Expertise,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
  /// The current booking status does not admit the requested transition.
  #[error("cannot {transition} an assignment that is {from}")]
  InvalidTransition {
    transition: TransitionKind,
    from:       BookingStatus,
  },

  /// A concurrent transition changed the assignment first.
  #[error("the assignment was taken by a concurrent booking")]
  Conflict,

  #[error("{0} not found: {1}")]
  NotFound(Entity, Uuid),

  /// A registry name is already taken.
  #[error("{0} already exists: {1:?}")]
  AlreadyExists(Entity, String),

  #[error("candidate is not eligible: {0}")]
  Ineligible(Mismatch),
}

impl BookingError {
  /// Stable machine-readable code, used by the HTTP layer.
  pub fn code(&self) -> &'static str {
    match self {
      Self::InvalidTransition { .. } => "invalid_transition",
      Self::Conflict => "conflict",
      Self::NotFound(..) => "not_found",
      Self::AlreadyExists(..) => "already_exists",
      Self::Ineligible(_) => "ineligible",
    }
  }
}

/// The result of a booking operation once storage has answered.
pub type Outcome<T> = std::result::Result<T, BookingError>;
