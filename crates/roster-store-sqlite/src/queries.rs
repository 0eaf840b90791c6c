//! Synchronous query helpers, run on the `tokio_rusqlite` connection thread.
//!
//! Everything that must be atomic takes `&mut Connection` and opens its own
//! transaction; plain readers take `&Connection` so they also work on an open
//! [`rusqlite::Transaction`].

use std::collections::BTreeSet;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use roster_core::{
  BookingError, Entity, Outcome,
  assignment::{BookingStatus, NewAssignment, ResourceAssignment},
  booking::{self, BookingEvent, Planned, Transition, TransitionContext, TransitionReceipt},
  candidate::{Availability, CandidateProfile, CandidateUpsert},
  fanout::FanoutJobState,
  matching::MatchNotification,
  registry::Role,
};

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_COLUMNS, CANDIDATE_COLUMNS, RawAssignment, RawCandidate, RawRole,
    ROLE_COLUMNS, decode_id_set, encode_dt, encode_opt_uuid, encode_uuid,
  },
};

const ASSIGNMENT_LANGUAGES: &str =
  "SELECT language_id FROM assignment_languages WHERE assignment_id = ?1";
const ASSIGNMENT_EXPERTISES: &str =
  "SELECT expertise_id FROM assignment_expertises WHERE assignment_id = ?1";
const CANDIDATE_LANGUAGES: &str =
  "SELECT language_id FROM candidate_languages WHERE candidate_id = ?1";
const CANDIDATE_EXPERTISES: &str =
  "SELECT expertise_id FROM candidate_expertises WHERE candidate_id = ?1";

// ─── Readers ─────────────────────────────────────────────────────────────────

fn load_id_set(conn: &Connection, sql: &str, owner: &str) -> Result<BTreeSet<Uuid>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let ids = stmt
    .query_map([owner], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  decode_id_set(ids)
}

fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

pub fn load_role(conn: &Connection, role_id: &str) -> Result<Option<Role>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE role_id = ?1"),
      [role_id],
      RawRole::from_row,
    )
    .optional()?;
  raw.map(RawRole::into_role).transpose()
}

/// Assignments matching `filter` (a `WHERE …` clause or empty), in insertion
/// order, with their membership sets.
pub fn load_assignments<P: rusqlite::Params>(
  conn: &Connection,
  filter: &str,
  params: P,
) -> Result<Vec<ResourceAssignment>> {
  let sql = format!(
    "SELECT {ASSIGNMENT_COLUMNS} FROM resource_assignments {filter} ORDER BY rowid"
  );
  let raws = {
    let mut stmt = conn.prepare(&sql)?;
    stmt
      .query_map(params, RawAssignment::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws
    .into_iter()
    .map(|raw| {
      let languages = load_id_set(conn, ASSIGNMENT_LANGUAGES, &raw.assignment_id)?;
      let expertises = load_id_set(conn, ASSIGNMENT_EXPERTISES, &raw.assignment_id)?;
      raw.into_assignment(languages, expertises)
    })
    .collect()
}

pub fn load_assignment(
  conn: &Connection,
  assignment_id: &str,
) -> Result<Option<ResourceAssignment>> {
  Ok(
    load_assignments(conn, "WHERE assignment_id = ?1", [assignment_id])?
      .into_iter()
      .next(),
  )
}

pub fn load_candidates<P: rusqlite::Params>(
  conn: &Connection,
  filter: &str,
  params: P,
) -> Result<Vec<CandidateProfile>> {
  let sql =
    format!("SELECT {CANDIDATE_COLUMNS} FROM candidates {filter} ORDER BY rowid");
  let raws = {
    let mut stmt = conn.prepare(&sql)?;
    stmt
      .query_map(params, RawCandidate::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws
    .into_iter()
    .map(|raw| {
      let languages = load_id_set(conn, CANDIDATE_LANGUAGES, &raw.candidate_id)?;
      let expertises = load_id_set(conn, CANDIDATE_EXPERTISES, &raw.candidate_id)?;
      raw.into_candidate(languages, expertises)
    })
    .collect()
}

pub fn load_candidate(
  conn: &Connection,
  candidate_id: &str,
) -> Result<Option<CandidateProfile>> {
  Ok(
    load_candidates(conn, "WHERE candidate_id = ?1", [candidate_id])?
      .into_iter()
      .next(),
  )
}

/// Whether `occupant` already holds another accepted slot with the same
/// project and role as `assignment`.
fn is_occupied(
  conn: &Connection,
  assignment: &ResourceAssignment,
  occupant: Uuid,
) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM resource_assignments
         WHERE project_id = ?1 AND role_id = ?2 AND candidate_id = ?3
           AND booking_status = 'accepted' AND assignment_id != ?4",
        params![
          encode_uuid(assignment.project_id),
          encode_uuid(assignment.role_id),
          encode_uuid(occupant),
          encode_uuid(assignment.assignment_id),
        ],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Read, plan and conditionally write one transition inside a single
/// `BEGIN IMMEDIATE` transaction.
///
/// Every early return drops the transaction, which rolls it back.
pub fn apply_transition(
  conn: &mut Connection,
  assignment_id: Uuid,
  transition: Transition,
) -> Result<Outcome<TransitionReceipt>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let id_str = encode_uuid(assignment_id);

  let Some(assignment) = load_assignment(&tx, &id_str)? else {
    return Ok(Err(BookingError::NotFound(Entity::Assignment, assignment_id)));
  };
  let role = load_role(&tx, &encode_uuid(assignment.role_id))?;
  let candidate = match transition {
    Transition::Accept { candidate_id } => {
      load_candidate(&tx, &encode_uuid(candidate_id))?
    }
    _ => None,
  };
  let occupied = match transition.occupant(role.as_ref()) {
    Some(occupant) => is_occupied(&tx, &assignment, occupant)?,
    None => false,
  };

  let ctx = TransitionContext {
    assignment: &assignment,
    role: role.as_ref(),
    candidate: candidate.as_ref(),
    occupied,
  };
  let plan = match booking::plan(&transition, &ctx) {
    Ok(Planned::Apply(plan)) => plan,
    Ok(Planned::Unchanged) => {
      return Ok(Ok(TransitionReceipt { assignment, event: None }));
    }
    Err(rejection) => return Ok(Err(rejection)),
  };

  let now = Utc::now();
  let now_str = encode_dt(now);
  let update = tx.execute(
    "UPDATE resource_assignments
     SET booking_status = ?1, candidate_id = ?2, updated_at = ?3
     WHERE assignment_id = ?4 AND booking_status = ?5 AND candidate_id IS ?6",
    params![
      plan.to.as_ref(),
      encode_opt_uuid(plan.to_candidate),
      now_str,
      id_str,
      plan.from.as_ref(),
      encode_opt_uuid(plan.from_candidate),
    ],
  );
  match update {
    Ok(1) => {}
    Ok(_) => return Ok(Err(BookingError::Conflict)),
    Err(e) if is_constraint_violation(&e) => return Ok(Err(BookingError::Conflict)),
    Err(e) => return Err(e.into()),
  }

  let event = BookingEvent::from_plan(assignment_id, &plan, now);
  tx.execute(
    "INSERT INTO booking_events (
       event_id, assignment_id, transition, from_status, to_status,
       candidate_id, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(event.event_id),
      id_str,
      event.transition.as_ref(),
      event.from.as_ref(),
      event.to.as_ref(),
      encode_opt_uuid(event.candidate_id),
      now_str,
    ],
  )?;

  if plan.fan_out {
    tx.execute(
      "INSERT INTO fanout_jobs (job_id, assignment_id, state, attempts, enqueued_at, updated_at)
       VALUES (?1, ?2, 'pending', 0, ?3, ?3)",
      params![encode_uuid(Uuid::new_v4()), id_str, now_str],
    )?;
  }

  tx.commit()?;

  let assignment = ResourceAssignment {
    booking_status: plan.to,
    candidate_id: plan.to_candidate,
    updated_at: now,
    ..assignment
  };
  Ok(Ok(TransitionReceipt { assignment, event: Some(event) }))
}

// ─── Intake ──────────────────────────────────────────────────────────────────

/// Insert a uniquely named registry row. `false` when the name is taken.
pub fn insert_named(conn: &Connection, sql: &str, id: &str, name: &str) -> Result<bool> {
  match conn.execute(sql, params![id, name]) {
    Ok(_) => Ok(true),
    Err(e) if is_constraint_violation(&e) => Ok(false),
    Err(e) => Err(e.into()),
  }
}

pub fn insert_assignment(
  conn: &mut Connection,
  input: NewAssignment,
) -> Result<Outcome<ResourceAssignment>> {
  let tx = conn.transaction()?;

  let project_id = encode_uuid(input.project_id);
  let role_id = encode_uuid(input.role_id);
  if !exists(&tx, "SELECT 1 FROM projects WHERE project_id = ?1", &project_id)? {
    return Ok(Err(BookingError::NotFound(Entity::Project, input.project_id)));
  }
  if !exists(&tx, "SELECT 1 FROM roles WHERE role_id = ?1", &role_id)? {
    return Ok(Err(BookingError::NotFound(Entity::Role, input.role_id)));
  }
  for &id in &input.required_languages {
    let sql = "SELECT 1 FROM languages WHERE language_id = ?1";
    if !exists(&tx, sql, &encode_uuid(id))? {
      return Ok(Err(BookingError::NotFound(Entity::Language, id)));
    }
  }
  for &id in &input.required_expertises {
    let sql = "SELECT 1 FROM expertises WHERE expertise_id = ?1";
    if !exists(&tx, sql, &encode_uuid(id))? {
      return Ok(Err(BookingError::NotFound(Entity::Expertise, id)));
    }
  }

  let now = Utc::now();
  let assignment = ResourceAssignment {
    assignment_id:       Uuid::new_v4(),
    project_id:          input.project_id,
    role_id:             input.role_id,
    required_seniority:  input.required_seniority,
    required_languages:  input.required_languages,
    required_expertises: input.required_expertises,
    booking_status:      BookingStatus::Draft,
    candidate_id:        None,
    price_cents:         input.price_cents,
    created_at:          now,
    updated_at:          now,
  };
  let id_str = encode_uuid(assignment.assignment_id);

  tx.execute(
    "INSERT INTO resource_assignments (
       assignment_id, project_id, role_id, required_seniority,
       booking_status, candidate_id, price_cents, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)",
    params![
      id_str,
      project_id,
      role_id,
      assignment.required_seniority.as_ref(),
      assignment.booking_status.as_ref(),
      assignment.price_cents,
      encode_dt(now),
    ],
  )?;
  for &id in &assignment.required_languages {
    tx.execute(
      "INSERT INTO assignment_languages (assignment_id, language_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(id)],
    )?;
  }
  for &id in &assignment.required_expertises {
    tx.execute(
      "INSERT INTO assignment_expertises (assignment_id, expertise_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(id)],
    )?;
  }

  tx.commit()?;
  Ok(Ok(assignment))
}

pub fn upsert_candidate(
  conn: &mut Connection,
  candidate_id: Uuid,
  input: CandidateUpsert,
) -> Result<CandidateProfile> {
  let tx = conn.transaction()?;
  let now = Utc::now();
  let id_str = encode_uuid(candidate_id);

  tx.execute(
    "INSERT INTO candidates (candidate_id, role_id, seniority, availability, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (candidate_id) DO UPDATE SET
       role_id      = excluded.role_id,
       seniority    = excluded.seniority,
       availability = excluded.availability,
       updated_at   = excluded.updated_at",
    params![
      id_str,
      encode_opt_uuid(input.role_id),
      input.seniority.map(|s| s.as_ref().to_owned()),
      input.availability.as_ref(),
      encode_dt(now),
    ],
  )?;

  tx.execute("DELETE FROM candidate_languages WHERE candidate_id = ?1", [&id_str])?;
  tx.execute("DELETE FROM candidate_expertises WHERE candidate_id = ?1", [&id_str])?;
  for &id in &input.languages {
    tx.execute(
      "INSERT OR IGNORE INTO candidate_languages (candidate_id, language_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(id)],
    )?;
  }
  for &id in &input.expertises {
    tx.execute(
      "INSERT OR IGNORE INTO candidate_expertises (candidate_id, expertise_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(id)],
    )?;
  }

  tx.commit()?;
  Ok(CandidateProfile {
    candidate_id,
    role_id: input.role_id,
    seniority: input.seniority,
    availability: input.availability,
    languages: input.languages,
    expertises: input.expertises,
    updated_at: now,
  })
}

pub fn set_availability(
  conn: &mut Connection,
  candidate_id: Uuid,
  availability: Availability,
) -> Result<Outcome<CandidateProfile>> {
  let id_str = encode_uuid(candidate_id);
  let changed = conn.execute(
    "UPDATE candidates SET availability = ?1, updated_at = ?2 WHERE candidate_id = ?3",
    params![availability.as_ref(), encode_dt(Utc::now()), id_str],
  )?;
  if changed == 0 {
    return Ok(Err(BookingError::NotFound(Entity::Candidate, candidate_id)));
  }
  Ok(
    load_candidate(conn, &id_str)?
      .ok_or(BookingError::NotFound(Entity::Candidate, candidate_id)),
  )
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

pub fn record_notifications(
  conn: &mut Connection,
  assignment_id: Uuid,
  candidate_ids: Vec<Uuid>,
) -> Result<Vec<MatchNotification>> {
  let tx = conn.transaction()?;
  let mut created = Vec::new();
  {
    let mut stmt = tx.prepare(
      "INSERT OR IGNORE INTO match_notifications (
         notification_id, candidate_id, assignment_id, created_at
       ) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for candidate_id in candidate_ids {
      let notification = MatchNotification {
        notification_id: Uuid::new_v4(),
        candidate_id,
        assignment_id,
        created_at: Utc::now(),
        delivered_at: None,
      };
      let inserted = stmt.execute(params![
        encode_uuid(notification.notification_id),
        encode_uuid(candidate_id),
        encode_uuid(assignment_id),
        encode_dt(notification.created_at),
      ])?;
      if inserted == 1 {
        created.push(notification);
      }
    }
  }
  tx.commit()?;
  Ok(created)
}

pub fn mark_notifications_delivered(
  conn: &mut Connection,
  notification_ids: Vec<Uuid>,
) -> Result<()> {
  let tx = conn.transaction()?;
  let now_str = encode_dt(Utc::now());
  {
    let mut stmt = tx.prepare(
      "UPDATE match_notifications SET delivered_at = ?1
       WHERE notification_id = ?2 AND delivered_at IS NULL",
    )?;
    for id in notification_ids {
      stmt.execute(params![now_str, encode_uuid(id)])?;
    }
  }
  tx.commit()?;
  Ok(())
}

pub fn fail_fanout_job(
  conn: &mut Connection,
  job_id: Uuid,
  error: &str,
  max_attempts: u32,
) -> Result<FanoutJobState> {
  let tx = conn.transaction()?;
  let id_str = encode_uuid(job_id);

  let attempts: u32 = tx
    .query_row(
      "SELECT attempts FROM fanout_jobs WHERE job_id = ?1",
      [&id_str],
      |row| row.get(0),
    )
    .optional()?
    .ok_or(Error::JobNotFound(job_id))?;

  let attempts = attempts + 1;
  let state = if attempts >= max_attempts {
    FanoutJobState::Dead
  } else {
    FanoutJobState::Pending
  };

  tx.execute(
    "UPDATE fanout_jobs
     SET attempts = ?1, last_error = ?2, state = ?3, updated_at = ?4
     WHERE job_id = ?5",
    params![attempts, error, state.as_ref(), encode_dt(Utc::now()), id_str],
  )?;
  tx.commit()?;
  Ok(state)
}
