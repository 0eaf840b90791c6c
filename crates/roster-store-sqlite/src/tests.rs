//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  collections::BTreeSet,
  sync::{Arc, Mutex},
};

use roster_core::{
  BookingEngine, BookingError, Entity,
  Outcome,
  assignment::{BookingStatus, NewAssignment, ResourceAssignment},
  booking::{BookingEvent, Transition, TransitionKind, TransitionReceipt},
  candidate::{Availability, CandidateProfile, CandidateUpsert},
  eligibility::Mismatch,
  fanout::{FanoutDriver, FanoutJob, FanoutJobState, FanoutReport, Notifier},
  matching::MatchNotification,
  project::{NewProject, Project},
  registry::{Expertise, Language, NewRole, Role, Seniority},
  store::RosterStore,
};
use uuid::Uuid;

use crate::{Error, Result, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store seeded with one role, one language, one expertise and a project.
struct World {
  engine:    BookingEngine<SqliteStore>,
  role:      Role,
  english:   Language,
  rust:      Expertise,
  project:   Project,
}

impl World {
  async fn new() -> Self {
    let s = store().await;
    let role = s
      .add_role(NewRole { name: "Backend developer".into(), automated: false })
      .await
      .unwrap();
    let english = s.add_language("English".into()).await.unwrap().unwrap();
    let rust = s.add_expertise("Rust".into()).await.unwrap().unwrap();
    let project = s
      .add_project(NewProject { owner_id: Uuid::new_v4(), status: Default::default() })
      .await
      .unwrap();
    Self { engine: BookingEngine::new(Arc::new(s)), role, english, rust, project }
  }

  fn store(&self) -> &SqliteStore { self.engine.store() }

  fn new_assignment(&self) -> NewAssignment {
    NewAssignment {
      project_id:          self.project.project_id,
      role_id:             self.role.role_id,
      required_seniority:  Seniority::Senior,
      required_languages:  BTreeSet::from([self.english.language_id]),
      required_expertises: BTreeSet::from([self.rust.expertise_id]),
      price_cents:         Some(90_000),
    }
  }

  async fn draft(&self) -> ResourceAssignment {
    self
      .store()
      .add_assignment(self.new_assignment())
      .await
      .unwrap()
      .unwrap()
  }

  async fn searching(&self) -> ResourceAssignment {
    let a = self.draft().await;
    self.engine.open(a.assignment_id).await.unwrap().unwrap().assignment
  }

  fn matching_profile(&self) -> CandidateUpsert {
    CandidateUpsert {
      role_id:      Some(self.role.role_id),
      seniority:    Some(Seniority::Senior),
      availability: Availability::Available,
      languages:    BTreeSet::from([self.english.language_id]),
      expertises:   BTreeSet::from([self.rust.expertise_id]),
    }
  }

  async fn candidate(&self, profile: CandidateUpsert) -> Uuid {
    let id = Uuid::new_v4();
    self.store().upsert_candidate(id, profile).await.unwrap();
    id
  }

  async fn eligible(&self) -> Uuid { self.candidate(self.matching_profile()).await }
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<MatchNotification>>>);

impl Notifier for Collect {
  fn request_delivery(&self, notification: &MatchNotification) {
    self.0.lock().unwrap().push(notification.clone());
  }
}

// ─── Registry and intake ─────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_role() {
  let s = store().await;
  let role = s
    .add_role(NewRole { name: "Designer".into(), automated: true })
    .await
    .unwrap();

  let fetched = s.get_role(role.role_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Designer");
  assert!(fetched.automated);
  assert!(s.get_role(Uuid::new_v4()).await.unwrap().is_none());
  assert_eq!(s.list_roles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn language_names_are_unique() {
  let s = store().await;
  s.add_language("French".into()).await.unwrap().unwrap();
  let err = s.add_language("French".into()).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::AlreadyExists(Entity::Language, "French".into()));
  s.add_expertise("Kotlin".into()).await.unwrap().unwrap();
  s.add_expertise("Go".into()).await.unwrap().unwrap();
  let err = s.add_expertise("Go".into()).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::AlreadyExists(Entity::Expertise, "Go".into()));

  assert_eq!(s.list_languages().await.unwrap().len(), 1);
  let names: Vec<_> =
    s.list_expertises().await.unwrap().into_iter().map(|e| e.name).collect();
  assert_eq!(names, vec!["Go", "Kotlin"]);
}

#[tokio::test]
async fn new_assignment_starts_as_unheld_draft() {
  let w = World::new().await;
  let a = w.draft().await;
  assert_eq!(a.booking_status, BookingStatus::Draft);
  assert_eq!(a.candidate_id, None);

  let fetched = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(fetched.required_languages, a.required_languages);
  assert_eq!(fetched.required_expertises, a.required_expertises);
  assert_eq!(fetched.price_cents, Some(90_000));
}

#[tokio::test]
async fn add_assignment_rejects_unknown_references() {
  let w = World::new().await;

  let missing = Uuid::new_v4();
  let input = NewAssignment { project_id: missing, ..w.new_assignment() };
  let err = w.store().add_assignment(input).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Project, missing));

  let mut input = w.new_assignment();
  input.required_languages.insert(missing);
  let err = w.store().add_assignment(input).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Language, missing));
}

#[tokio::test]
async fn upsert_candidate_replaces_memberships() {
  let w = World::new().await;
  let id = w.eligible().await;

  let profile = CandidateUpsert { languages: BTreeSet::new(), ..w.matching_profile() };
  w.store().upsert_candidate(id, profile).await.unwrap();

  let fetched = w.store().get_candidate(id).await.unwrap().unwrap();
  assert!(fetched.languages.is_empty());
  assert_eq!(fetched.expertises, BTreeSet::from([w.rust.expertise_id]));
}

#[tokio::test]
async fn set_availability_of_unknown_candidate_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s
    .set_availability(id, Availability::Paused)
    .await
    .unwrap()
    .unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Candidate, id));
}

// ─── Matching ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn exact_match_is_eligible() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  let eligible = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(eligible, BTreeSet::from([c]));
}

#[tokio::test]
async fn missing_language_is_not_eligible_and_cannot_accept() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w
    .candidate(CandidateUpsert { languages: BTreeSet::new(), ..w.matching_profile() })
    .await;

  let eligible = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert!(eligible.is_empty());

  let err = w.engine.accept(a.assignment_id, c).await.unwrap().unwrap_err();
  assert!(matches!(err, BookingError::Ineligible(Mismatch::Languages { .. })));
}

#[tokio::test]
async fn more_senior_candidate_is_not_eligible() {
  let w = World::new().await;
  let a = w.searching().await;
  w.candidate(CandidateUpsert { seniority: Some(Seniority::Expert), ..w.matching_profile() })
    .await;

  let eligible = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert!(eligible.is_empty());
}

#[tokio::test]
async fn malformed_seniority_never_matches() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  w.store()
    .execute_raw("UPDATE candidates SET seniority = 'wizard'")
    .await
    .unwrap();

  let fetched = w.store().get_candidate(c).await.unwrap().unwrap();
  assert_eq!(fetched.seniority, None);

  let err = w.engine.accept(a.assignment_id, c).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::Ineligible(Mismatch::IncompleteProfile));
}

#[tokio::test]
async fn eligibility_of_draft_assignment_is_empty() {
  let w = World::new().await;
  let a = w.draft().await;
  w.eligible().await;

  let eligible = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert!(eligible.is_empty());
}

#[tokio::test]
async fn notifications_are_recorded_once() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  let first = w.engine.fan_out(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(first.created.len(), 1);
  let second = w.engine.fan_out(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(second.eligible, BTreeSet::from([c]));
  assert!(second.created.is_empty());

  let notifications = w.store().notifications_for(c).await.unwrap();
  assert_eq!(notifications.len(), 1);
  assert_eq!(notifications[0].assignment_id, a.assignment_id);
}

// ─── Booking transitions ─────────────────────────────────────────────────────

#[tokio::test]
async fn open_moves_draft_to_searching_once() {
  let w = World::new().await;
  let a = w.draft().await;

  let receipt = w.engine.open(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(receipt.assignment.booking_status, BookingStatus::Searching);

  let err = w.engine.open(a.assignment_id).await.unwrap().unwrap_err();
  assert_eq!(
    err,
    BookingError::InvalidTransition {
      transition: TransitionKind::Open,
      from:       BookingStatus::Searching,
    }
  );
  assert_eq!(w.store().pending_fanout_jobs(10).await.unwrap().len(), 1);
  assert_eq!(w.store().booking_history(a.assignment_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn accept_books_eligible_candidate() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  let receipt = w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();
  assert_eq!(receipt.assignment.booking_status, BookingStatus::Accepted);
  assert_eq!(receipt.assignment.candidate_id, Some(c));

  let stored = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.booking_status, BookingStatus::Accepted);
  assert_eq!(stored.candidate_id, Some(c));

  let history = w.store().candidate_history(c).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].transition, TransitionKind::Accept);
  assert_eq!(history[0].from, BookingStatus::Searching);
  assert_eq!(history[0].to, BookingStatus::Accepted);
}

#[tokio::test]
async fn accept_of_draft_is_invalid() {
  let w = World::new().await;
  let a = w.draft().await;
  let c = w.eligible().await;

  let err = w.engine.accept(a.assignment_id, c).await.unwrap().unwrap_err();
  assert!(matches!(err, BookingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn accept_reports_missing_rows() {
  let w = World::new().await;
  let a = w.searching().await;

  let ghost = Uuid::new_v4();
  let err = w.engine.accept(a.assignment_id, ghost).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Candidate, ghost));

  let err = w.engine.accept(ghost, ghost).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Assignment, ghost));
}

#[tokio::test]
async fn repeated_accept_by_holder_changes_nothing() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();
  let again = w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();
  assert!(again.event.is_none());
  assert_eq!(again.assignment.candidate_id, Some(c));
  assert_eq!(w.store().booking_history(a.assignment_id).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_have_one_winner() {
  let w = World::new().await;
  let a = w.searching().await;

  let mut candidates = Vec::new();
  for _ in 0..8 {
    candidates.push(w.eligible().await);
  }

  let handles: Vec<_> = candidates
    .iter()
    .map(|&c| {
      let engine = w.engine.clone();
      let id = a.assignment_id;
      tokio::spawn(async move { engine.accept(id, c).await })
    })
    .collect();

  let mut winners = Vec::new();
  for (handle, c) in handles.into_iter().zip(&candidates) {
    match handle.await.unwrap().unwrap() {
      Ok(_) => winners.push(*c),
      Err(e) => assert_eq!(e, BookingError::Conflict),
    }
  }
  assert_eq!(winners.len(), 1);

  let stored = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.candidate_id, Some(winners[0]));

  let accepts = w
    .store()
    .booking_history(a.assignment_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|e| e.transition == TransitionKind::Accept)
    .count();
  assert_eq!(accepts, 1);
}

#[tokio::test]
async fn candidate_cannot_hold_two_slots_of_same_role_on_a_project() {
  let w = World::new().await;
  let first = w.searching().await;
  let second = w.searching().await;
  let c = w.eligible().await;

  w.engine.accept(first.assignment_id, c).await.unwrap().unwrap();
  let err = w.engine.accept(second.assignment_id, c).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::Conflict);

  let stored = w.store().get_assignment(second.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.booking_status, BookingStatus::Searching);
}

#[tokio::test]
async fn decline_reopens_for_matching() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  let other = w.eligible().await;
  let before = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(before, BTreeSet::from([c, other]));
  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();

  let receipt = w.engine.decline(a.assignment_id, c).await.unwrap().unwrap();
  assert_eq!(receipt.assignment.booking_status, BookingStatus::Searching);
  assert_eq!(receipt.assignment.candidate_id, None);

  let history = w.store().booking_history(a.assignment_id).await.unwrap();
  let kinds: Vec<_> = history.iter().map(|e| e.transition).collect();
  assert_eq!(
    kinds,
    vec![TransitionKind::Open, TransitionKind::Accept, TransitionKind::Decline]
  );
  assert_eq!(history[2].to, BookingStatus::Declined);
  assert_eq!(history[2].candidate_id, Some(c));

  // One job from open, one from the decline.
  assert_eq!(w.store().pending_fanout_jobs(10).await.unwrap().len(), 2);

  let after = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(after, before);
}

#[tokio::test]
async fn decline_by_someone_else_is_invalid() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  let stranger = w.eligible().await;
  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();

  let err = w.engine.decline(a.assignment_id, stranger).await.unwrap().unwrap_err();
  assert!(matches!(err, BookingError::InvalidTransition { .. }));
  let stored = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.candidate_id, Some(c));
}

#[tokio::test]
async fn withdraw_releases_the_holder() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  let err = w.engine.withdraw(a.assignment_id).await.unwrap().unwrap_err();
  assert!(matches!(err, BookingError::InvalidTransition { .. }));

  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();
  let receipt = w.engine.withdraw(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(receipt.assignment.booking_status, BookingStatus::Searching);
  assert_eq!(receipt.assignment.candidate_id, None);

  let event = receipt.event.unwrap();
  assert_eq!(event.transition, TransitionKind::Withdraw);
  assert_eq!(event.candidate_id, Some(c));
}

#[tokio::test]
async fn automated_role_is_accepted_on_open() {
  let w = World::new().await;
  let bot = w
    .store()
    .add_role(NewRole { name: "Test runner".into(), automated: true })
    .await
    .unwrap();
  let input = NewAssignment { role_id: bot.role_id, ..w.new_assignment() };
  let first = w.store().add_assignment(input.clone()).await.unwrap().unwrap();
  let second = w.store().add_assignment(input).await.unwrap().unwrap();

  let receipt = w.engine.open(first.assignment_id).await.unwrap().unwrap();
  assert_eq!(receipt.assignment.booking_status, BookingStatus::Accepted);
  assert_eq!(receipt.assignment.candidate_id, Some(bot.role_id));
  assert_eq!(receipt.event.unwrap().transition, TransitionKind::AutoAccept);
  assert!(w.store().pending_fanout_jobs(10).await.unwrap().is_empty());

  let err = w.engine.open(second.assignment_id).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::Conflict);
  let stored = w.store().get_assignment(second.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.booking_status, BookingStatus::Draft);
}

#[tokio::test]
async fn availability_change_keeps_existing_booking() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();

  w.store()
    .set_availability(c, Availability::Unavailable)
    .await
    .unwrap()
    .unwrap();

  let stored = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.booking_status, BookingStatus::Accepted);
  assert_eq!(stored.candidate_id, Some(c));

  let visible = w.engine.visible_assignments(c).await.unwrap().unwrap();
  assert_eq!(visible.len(), 1);
  assert_eq!(visible[0].assignment_id, a.assignment_id);
}

// ─── Storage constraints ─────────────────────────────────────────────────────

#[tokio::test]
async fn schema_rejects_inconsistent_booking_rows() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();
  w.searching().await;

  let s = w.store();
  assert!(
    s.execute_raw("UPDATE resource_assignments SET candidate_id = NULL WHERE booking_status = 'accepted'")
      .await
      .is_err()
  );
  assert!(
    s.execute_raw("UPDATE resource_assignments SET candidate_id = 'x' WHERE booking_status = 'searching'")
      .await
      .is_err()
  );
  assert!(
    s.execute_raw("UPDATE resource_assignments SET booking_status = 'declined'")
      .await
      .is_err()
  );
}

// ─── Visibility ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn loser_of_race_no_longer_sees_slot() {
  let w = World::new().await;
  let a = w.searching().await;
  let winner = w.eligible().await;
  let loser = w.eligible().await;

  let before = w.engine.visible_assignments(loser).await.unwrap().unwrap();
  assert_eq!(before.len(), 1);

  w.engine.accept(a.assignment_id, winner).await.unwrap().unwrap();
  let err = w.engine.accept(a.assignment_id, loser).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::Conflict);

  assert!(w.engine.visible_assignments(loser).await.unwrap().unwrap().is_empty());
  let held = w.engine.visible_assignments(winner).await.unwrap().unwrap();
  assert_eq!(held.len(), 1);
}

#[tokio::test]
async fn incomplete_profile_sees_nothing_open() {
  let w = World::new().await;
  w.searching().await;
  let c = w
    .candidate(CandidateUpsert { role_id: None, ..w.matching_profile() })
    .await;

  assert!(w.engine.visible_assignments(c).await.unwrap().unwrap().is_empty());

  let ghost = Uuid::new_v4();
  let err = w.engine.visible_assignments(ghost).await.unwrap().unwrap_err();
  assert_eq!(err, BookingError::NotFound(Entity::Candidate, ghost));
}

// ─── Fan-out outbox ──────────────────────────────────────────────────────────

#[tokio::test]
async fn driver_notifies_each_eligible_candidate_once() {
  let w = World::new().await;
  let a = w.searching().await;
  let c1 = w.eligible().await;
  let c2 = w.eligible().await;
  w.candidate(CandidateUpsert { expertises: BTreeSet::new(), ..w.matching_profile() })
    .await;

  let notifier = Collect::default();
  let driver = FanoutDriver::new(w.engine.clone(), notifier.clone(), 3);

  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report.jobs, 1);
  assert_eq!(report.notified, 2);

  let delivered: BTreeSet<_> =
    notifier.0.lock().unwrap().iter().map(|n| n.candidate_id).collect();
  assert_eq!(delivered, BTreeSet::from([c1, c2]));
  assert!(
    notifier.0.lock().unwrap().iter().all(|n| n.assignment_id == a.assignment_id)
  );

  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report.jobs, 0);
  assert_eq!(report.notified, 0);
}

#[tokio::test]
async fn notifications_recorded_outside_the_driver_are_delivered() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;

  let eligible = w
    .engine
    .find_eligible_candidates(a.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(eligible, BTreeSet::from([c]));

  let notifier = Collect::default();
  let driver = FanoutDriver::new(w.engine.clone(), notifier.clone(), 3);

  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report.jobs, 1);
  assert_eq!(report.notified, 1);
  assert_eq!(notifier.0.lock().unwrap()[0].candidate_id, c);
  assert!(w.store().notifications_for(c).await.unwrap()[0].delivered_at.is_some());

  // No job is pending any more; a later query still reaches delivery.
  let late = w.eligible().await;
  w.engine.find_eligible_candidates(a.assignment_id).await.unwrap().unwrap();
  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report.jobs, 0);
  assert_eq!(report.notified, 1);

  let delivered: Vec<_> =
    notifier.0.lock().unwrap().iter().map(|n| n.candidate_id).collect();
  assert_eq!(delivered, vec![c, late]);
  assert_eq!(driver.run_once(10).await.unwrap().notified, 0);
}

#[tokio::test]
async fn driver_skips_slots_booked_in_the_meantime() {
  let w = World::new().await;
  let a = w.searching().await;
  let c = w.eligible().await;
  w.engine.find_eligible_candidates(a.assignment_id).await.unwrap().unwrap();
  w.engine.accept(a.assignment_id, c).await.unwrap().unwrap();

  let notifier = Collect::default();
  let driver = FanoutDriver::new(w.engine.clone(), notifier.clone(), 3);

  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report.jobs, 1);
  assert_eq!(report.notified, 0);
  assert!(notifier.0.lock().unwrap().is_empty());
  assert!(w.store().pending_fanout_jobs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_job_is_parked_after_max_attempts() {
  let w = World::new().await;
  w.searching().await;
  let job = w.store().pending_fanout_jobs(1).await.unwrap().remove(0);

  let state = w
    .store()
    .fail_fanout_job(job.job_id, "boom".into(), 2)
    .await
    .unwrap();
  assert_eq!(state, FanoutJobState::Pending);

  let retried = w.store().pending_fanout_jobs(1).await.unwrap().remove(0);
  assert_eq!(retried.attempts, 1);
  assert_eq!(retried.last_error.as_deref(), Some("boom"));

  let state = w
    .store()
    .fail_fanout_job(job.job_id, "boom".into(), 2)
    .await
    .unwrap();
  assert_eq!(state, FanoutJobState::Dead);
  assert!(w.store().pending_fanout_jobs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn completing_unknown_job_fails() {
  let s = store().await;
  assert!(s.complete_fanout_job(Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn driver_retries_then_parks_failing_job_without_touching_booking() {
  let w = World::new().await;
  let a = w.searching().await;
  w.eligible().await;
  let job = w.store().pending_fanout_jobs(1).await.unwrap().remove(0);

  let engine = BookingEngine::new(Arc::new(CandidatesUnreachable(w.store().clone())));
  let notifier = Collect::default();
  let driver = FanoutDriver::new(engine, notifier.clone(), 3);

  for attempt in 1..=2 {
    let report = driver.run_once(10).await.unwrap();
    assert_eq!(report, FanoutReport { jobs: 1, retried: 1, ..Default::default() });
    let pending = w.store().get_fanout_job(job.job_id).await.unwrap().unwrap();
    assert_eq!(pending.state, FanoutJobState::Pending);
    assert_eq!(pending.attempts, attempt);
  }

  let report = driver.run_once(10).await.unwrap();
  assert_eq!(report, FanoutReport { jobs: 1, parked: 1, ..Default::default() });

  let parked = w.store().get_fanout_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(parked.state, FanoutJobState::Dead);
  assert_eq!(parked.attempts, 3);
  assert!(parked.last_error.is_some());
  assert_eq!(driver.run_once(10).await.unwrap().jobs, 0);
  assert!(notifier.0.lock().unwrap().is_empty());

  let stored = w.store().get_assignment(a.assignment_id).await.unwrap().unwrap();
  assert_eq!(stored.booking_status, BookingStatus::Searching);
  assert_eq!(stored.candidate_id, None);
}

/// Delegates to a real store but cannot reach the candidate population.
struct CandidatesUnreachable(SqliteStore);

impl RosterStore for CandidatesUnreachable {
  type Error = Error;

  async fn add_role(&self, input: NewRole) -> Result<Role> { self.0.add_role(input).await }

  async fn get_role(&self, id: Uuid) -> Result<Option<Role>> { self.0.get_role(id).await }

  async fn list_roles(&self) -> Result<Vec<Role>> { self.0.list_roles().await }

  async fn add_language(&self, name: String) -> Result<Outcome<Language>> {
    self.0.add_language(name).await
  }

  async fn list_languages(&self) -> Result<Vec<Language>> { self.0.list_languages().await }

  async fn add_expertise(&self, name: String) -> Result<Outcome<Expertise>> {
    self.0.add_expertise(name).await
  }

  async fn list_expertises(&self) -> Result<Vec<Expertise>> { self.0.list_expertises().await }

  async fn add_project(&self, input: NewProject) -> Result<Project> {
    self.0.add_project(input).await
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    self.0.get_project(id).await
  }

  async fn add_assignment(&self, input: NewAssignment) -> Result<Outcome<ResourceAssignment>> {
    self.0.add_assignment(input).await
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<ResourceAssignment>> {
    self.0.get_assignment(id).await
  }

  async fn upsert_candidate(&self, id: Uuid, input: CandidateUpsert) -> Result<CandidateProfile> {
    self.0.upsert_candidate(id, input).await
  }

  async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>> {
    self.0.get_candidate(id).await
  }

  async fn set_availability(
    &self,
    id: Uuid,
    availability: Availability,
  ) -> Result<Outcome<CandidateProfile>> {
    self.0.set_availability(id, availability).await
  }

  async fn apply_transition(
    &self,
    assignment_id: Uuid,
    transition: Transition,
  ) -> Result<Outcome<TransitionReceipt>> {
    self.0.apply_transition(assignment_id, transition).await
  }

  async fn booking_history(&self, assignment_id: Uuid) -> Result<Vec<BookingEvent>> {
    self.0.booking_history(assignment_id).await
  }

  async fn candidate_history(&self, candidate_id: Uuid) -> Result<Vec<BookingEvent>> {
    self.0.candidate_history(candidate_id).await
  }

  async fn prefiltered_candidates(
    &self,
    _role_id: Uuid,
    _seniority: Seniority,
  ) -> Result<Vec<CandidateProfile>> {
    Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed))
  }

  async fn assignments_held_by(&self, candidate_id: Uuid) -> Result<Vec<ResourceAssignment>> {
    self.0.assignments_held_by(candidate_id).await
  }

  async fn searching_assignments(
    &self,
    role_id: Uuid,
    seniority: Seniority,
  ) -> Result<Vec<ResourceAssignment>> {
    self.0.searching_assignments(role_id, seniority).await
  }

  async fn record_notifications(
    &self,
    assignment_id: Uuid,
    candidate_ids: Vec<Uuid>,
  ) -> Result<Vec<MatchNotification>> {
    self.0.record_notifications(assignment_id, candidate_ids).await
  }

  async fn notifications_for(&self, candidate_id: Uuid) -> Result<Vec<MatchNotification>> {
    self.0.notifications_for(candidate_id).await
  }

  async fn undelivered_notifications(&self, limit: usize) -> Result<Vec<MatchNotification>> {
    self.0.undelivered_notifications(limit).await
  }

  async fn mark_notifications_delivered(&self, notification_ids: Vec<Uuid>) -> Result<()> {
    self.0.mark_notifications_delivered(notification_ids).await
  }

  async fn pending_fanout_jobs(&self, limit: usize) -> Result<Vec<FanoutJob>> {
    self.0.pending_fanout_jobs(limit).await
  }

  async fn get_fanout_job(&self, job_id: Uuid) -> Result<Option<FanoutJob>> {
    self.0.get_fanout_job(job_id).await
  }

  async fn complete_fanout_job(&self, job_id: Uuid) -> Result<()> {
    self.0.complete_fanout_job(job_id).await
  }

  async fn fail_fanout_job(
    &self,
    job_id: Uuid,
    error: String,
    max_attempts: u32,
  ) -> Result<FanoutJobState> {
    self.0.fail_fanout_job(job_id, error, max_attempts).await
  }
}
