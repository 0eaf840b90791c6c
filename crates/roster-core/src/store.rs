//! The `RosterStore` trait.
//!
//! Implemented by storage backends (e.g. `roster-store-sqlite`). Higher layers
//! (`roster-api`, `roster-server`) depend on this abstraction through
//! [`crate::BookingEngine`], not on any concrete backend.
//!
//! Calls that can fail for booking reasons return `Result<Outcome<T>, _>`:
//! the inner [`Outcome`] carries the typed rejection, the outer error is
//! reserved for storage failure.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Outcome,
  assignment::{NewAssignment, ResourceAssignment},
  booking::{BookingEvent, Transition, TransitionReceipt},
  candidate::{Availability, CandidateProfile, CandidateUpsert},
  fanout::{FanoutJob, FanoutJobState},
  matching::MatchNotification,
  project::{NewProject, Project},
  registry::{Expertise, Language, NewRole, Role, Seniority},
};

/// Abstraction over a Roster storage backend.
///
/// The assignment row is the only shared mutable record. Its booking fields
/// change exclusively through [`RosterStore::apply_transition`], which must
/// read the snapshot, run [`crate::booking::plan`] and perform the
/// conditional write as a single atomic unit.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Registry ──────────────────────────────────────────────────────────

  fn add_role(
    &self,
    input: NewRole,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  fn list_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  /// Register a language. Names are unique; a taken name is `AlreadyExists`.
  fn add_language(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Outcome<Language>, Self::Error>> + Send + '_;

  fn list_languages(
    &self,
  ) -> impl Future<Output = Result<Vec<Language>, Self::Error>> + Send + '_;

  /// Register an expertise. Names are unique, as for languages.
  fn add_expertise(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Outcome<Expertise>, Self::Error>> + Send + '_;

  fn list_expertises(
    &self,
  ) -> impl Future<Output = Result<Vec<Expertise>, Self::Error>> + Send + '_;

  // ── Intake ────────────────────────────────────────────────────────────

  fn add_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  /// Persist a new assignment in `draft`. Rejects unknown project, role,
  /// language or expertise ids with `NotFound`.
  fn add_assignment(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<Outcome<ResourceAssignment>, Self::Error>>
  + Send
  + '_;

  fn get_assignment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ResourceAssignment>, Self::Error>>
  + Send
  + '_;

  /// Create or replace a candidate profile, including both membership sets.
  fn upsert_candidate(
    &self,
    id: Uuid,
    input: CandidateUpsert,
  ) -> impl Future<Output = Result<CandidateProfile, Self::Error>> + Send + '_;

  fn get_candidate(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CandidateProfile>, Self::Error>>
  + Send
  + '_;

  /// Change availability only. Accepted bookings are left alone.
  fn set_availability(
    &self,
    id: Uuid,
    availability: Availability,
  ) -> impl Future<Output = Result<Outcome<CandidateProfile>, Self::Error>>
  + Send
  + '_;

  // ── Booking ───────────────────────────────────────────────────────────

  /// Atomically apply `transition` to an assignment.
  ///
  /// On success the history event is appended, and a fan-out job enqueued
  /// when the plan asks for one, in the same atomic unit as the state change.
  fn apply_transition(
    &self,
    assignment_id: Uuid,
    transition: Transition,
  ) -> impl Future<Output = Result<Outcome<TransitionReceipt>, Self::Error>>
  + Send
  + '_;

  /// Booking history of an assignment, oldest first.
  fn booking_history(
    &self,
    assignment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<BookingEvent>, Self::Error>> + Send + '_;

  /// Every booking event naming this candidate, oldest first.
  fn candidate_history(
    &self,
    candidate_id: Uuid,
  ) -> impl Future<Output = Result<Vec<BookingEvent>, Self::Error>> + Send + '_;

  // ── Matching reads ────────────────────────────────────────────────────

  /// Candidates whose role and seniority equal the given ones. Skills and
  /// availability are left to the caller.
  fn prefiltered_candidates(
    &self,
    role_id: Uuid,
    seniority: Seniority,
  ) -> impl Future<Output = Result<Vec<CandidateProfile>, Self::Error>>
  + Send
  + '_;

  /// Assignments whose `candidate_id` is this candidate, in any status.
  fn assignments_held_by(
    &self,
    candidate_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ResourceAssignment>, Self::Error>>
  + Send
  + '_;

  /// Searching assignments for the given role and seniority.
  fn searching_assignments(
    &self,
    role_id: Uuid,
    seniority: Seniority,
  ) -> impl Future<Output = Result<Vec<ResourceAssignment>, Self::Error>>
  + Send
  + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Insert one notification per candidate, skipping pairs that already
  /// exist. Returns only the rows created by this call.
  fn record_notifications(
    &self,
    assignment_id: Uuid,
    candidate_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<MatchNotification>, Self::Error>>
  + Send
  + '_;

  fn notifications_for(
    &self,
    candidate_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MatchNotification>, Self::Error>>
  + Send
  + '_;

  /// Up to `limit` notifications not yet handed to delivery, oldest first,
  /// whose assignment is still searching.
  fn undelivered_notifications(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<MatchNotification>, Self::Error>>
  + Send
  + '_;

  /// Stamp `delivered_at` on the given notifications.
  fn mark_notifications_delivered(
    &self,
    notification_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Fan-out outbox ────────────────────────────────────────────────────

  /// Up to `limit` pending jobs, oldest first.
  fn pending_fanout_jobs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<FanoutJob>, Self::Error>> + Send + '_;

  fn get_fanout_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Option<FanoutJob>, Self::Error>> + Send + '_;

  fn complete_fanout_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a failed attempt. The job is parked as `Dead` once `attempts`
  /// reaches `max_attempts`; the returned state says which happened.
  fn fail_fanout_job(
    &self,
    job_id: Uuid,
    error: String,
    max_attempts: u32,
  ) -> impl Future<Output = Result<FanoutJobState, Self::Error>> + Send + '_;
}
