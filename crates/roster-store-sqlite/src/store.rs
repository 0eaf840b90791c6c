//! [`SqliteStore`]: the SQLite implementation of [`RosterStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::params;
use tracing::debug;
use uuid::Uuid;

use roster_core::{
  BookingError, Entity, Outcome,
  assignment::{NewAssignment, ResourceAssignment},
  booking::{BookingEvent, Transition, TransitionReceipt},
  candidate::{Availability, CandidateProfile, CandidateUpsert},
  fanout::{FanoutJob, FanoutJobState},
  matching::MatchNotification,
  project::{NewProject, Project},
  registry::{Expertise, Language, NewRole, Role, Seniority},
  store::RosterStore,
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, JOB_COLUMNS, NOTIFICATION_COLUMNS, PROJECT_COLUMNS, ROLE_COLUMNS,
    RawEvent, RawJob, RawNotification, RawProject, RawRole, encode_dt, encode_uuid,
    into_expertise, into_language, language_from_row,
  },
  queries,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted. All calls
/// are serialised on the connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .with_conn(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Execute raw SQL, bypassing every check the store performs.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<usize> {
    self.with_conn(move |conn| Ok(conn.execute(sql, [])?)).await
  }

  /// Run `f` on the connection thread, keeping this crate's error type.
  async fn with_conn<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    self
      .conn
      .call(move |conn| f(conn).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e))))
      .await
      .map_err(|e| match e {
        tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
          Ok(err) => *err,
          Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
        },
        other => Error::Database(other),
      })
  }

  async fn query_list<T, Raw, F, D>(
    &self,
    sql: String,
    param: Option<String>,
    from_row: F,
    decode: D,
  ) -> Result<Vec<T>>
  where
    T: Send + 'static,
    Raw: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<Raw> + Send + 'static,
    D: Fn(Raw) -> Result<T> + Send + 'static,
  {
    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let raws = match &param {
          Some(p) => stmt.query_map([p], &from_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt.query_map([], &from_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };
        raws.into_iter().map(&decode).collect()
      })
      .await
  }
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Registry ──────────────────────────────────────────────────────────────

  async fn add_role(&self, input: NewRole) -> Result<Role> {
    let role = Role {
      role_id:    Uuid::new_v4(),
      name:       input.name,
      automated:  input.automated,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(role.role_id);
    let name = role.name.clone();
    let at_str = encode_dt(role.created_at);
    let automated = role.automated;

    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT INTO roles (role_id, name, automated, created_at) VALUES (?1, ?2, ?3, ?4)",
          params![id_str, name, automated, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(role)
  }

  async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
    let id_str = encode_uuid(id);
    self.with_conn(move |conn| queries::load_role(conn, &id_str)).await
  }

  async fn list_roles(&self) -> Result<Vec<Role>> {
    self
      .query_list(
        format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"),
        None,
        RawRole::from_row,
        RawRole::into_role,
      )
      .await
  }

  async fn add_language(&self, name: String) -> Result<Outcome<Language>> {
    let language = Language { language_id: Uuid::new_v4(), name };
    let id_str = encode_uuid(language.language_id);
    let name = language.name.clone();

    let inserted = self
      .with_conn(move |conn| {
        queries::insert_named(
          conn,
          "INSERT INTO languages (language_id, name) VALUES (?1, ?2)",
          &id_str,
          &name,
        )
      })
      .await?;

    if !inserted {
      return Ok(Err(BookingError::AlreadyExists(Entity::Language, language.name)));
    }
    Ok(Ok(language))
  }

  async fn list_languages(&self) -> Result<Vec<Language>> {
    self
      .query_list(
        "SELECT language_id, name FROM languages ORDER BY name".to_owned(),
        None,
        language_from_row,
        into_language,
      )
      .await
  }

  async fn add_expertise(&self, name: String) -> Result<Outcome<Expertise>> {
    let expertise = Expertise { expertise_id: Uuid::new_v4(), name };
    let id_str = encode_uuid(expertise.expertise_id);
    let name = expertise.name.clone();

    let inserted = self
      .with_conn(move |conn| {
        queries::insert_named(
          conn,
          "INSERT INTO expertises (expertise_id, name) VALUES (?1, ?2)",
          &id_str,
          &name,
        )
      })
      .await?;

    if !inserted {
      return Ok(Err(BookingError::AlreadyExists(Entity::Expertise, expertise.name)));
    }
    Ok(Ok(expertise))
  }

  async fn list_expertises(&self) -> Result<Vec<Expertise>> {
    self
      .query_list(
        "SELECT expertise_id, name FROM expertises ORDER BY name".to_owned(),
        None,
        language_from_row,
        into_expertise,
      )
      .await
  }

  // ── Intake ────────────────────────────────────────────────────────────────

  async fn add_project(&self, input: NewProject) -> Result<Project> {
    let project = Project {
      project_id: Uuid::new_v4(),
      owner_id:   input.owner_id,
      status:     input.status,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(project.project_id);
    let owner_str = encode_uuid(project.owner_id);
    let status_str = project.status.as_ref().to_owned();
    let at_str = encode_dt(project.created_at);

    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, owner_id, status, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![id_str, owner_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    Ok(
      self
        .query_list(
          format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
          Some(encode_uuid(id)),
          RawProject::from_row,
          RawProject::into_project,
        )
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn add_assignment(
    &self,
    input: NewAssignment,
  ) -> Result<Outcome<ResourceAssignment>> {
    self
      .with_conn(move |conn| queries::insert_assignment(conn, input))
      .await
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<ResourceAssignment>> {
    let id_str = encode_uuid(id);
    self
      .with_conn(move |conn| queries::load_assignment(conn, &id_str))
      .await
  }

  async fn upsert_candidate(
    &self,
    id: Uuid,
    input: CandidateUpsert,
  ) -> Result<CandidateProfile> {
    self
      .with_conn(move |conn| queries::upsert_candidate(conn, id, input))
      .await
  }

  async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>> {
    let id_str = encode_uuid(id);
    self
      .with_conn(move |conn| queries::load_candidate(conn, &id_str))
      .await
  }

  async fn set_availability(
    &self,
    id: Uuid,
    availability: Availability,
  ) -> Result<Outcome<CandidateProfile>> {
    self
      .with_conn(move |conn| queries::set_availability(conn, id, availability))
      .await
  }

  // ── Booking ───────────────────────────────────────────────────────────────

  async fn apply_transition(
    &self,
    assignment_id: Uuid,
    transition: Transition,
  ) -> Result<Outcome<TransitionReceipt>> {
    self
      .with_conn(move |conn| queries::apply_transition(conn, assignment_id, transition))
      .await
  }

  async fn booking_history(&self, assignment_id: Uuid) -> Result<Vec<BookingEvent>> {
    self
      .query_list(
        format!(
          "SELECT {EVENT_COLUMNS} FROM booking_events WHERE assignment_id = ?1 ORDER BY rowid"
        ),
        Some(encode_uuid(assignment_id)),
        RawEvent::from_row,
        RawEvent::into_event,
      )
      .await
  }

  async fn candidate_history(&self, candidate_id: Uuid) -> Result<Vec<BookingEvent>> {
    self
      .query_list(
        format!(
          "SELECT {EVENT_COLUMNS} FROM booking_events WHERE candidate_id = ?1 ORDER BY rowid"
        ),
        Some(encode_uuid(candidate_id)),
        RawEvent::from_row,
        RawEvent::into_event,
      )
      .await
  }

  // ── Matching reads ────────────────────────────────────────────────────────

  async fn prefiltered_candidates(
    &self,
    role_id: Uuid,
    seniority: Seniority,
  ) -> Result<Vec<CandidateProfile>> {
    let role_str = encode_uuid(role_id);
    let seniority_str = seniority.as_ref().to_owned();
    self
      .with_conn(move |conn| {
        queries::load_candidates(
          conn,
          "WHERE role_id = ?1 AND seniority = ?2",
          params![role_str, seniority_str],
        )
      })
      .await
  }

  async fn assignments_held_by(
    &self,
    candidate_id: Uuid,
  ) -> Result<Vec<ResourceAssignment>> {
    let id_str = encode_uuid(candidate_id);
    self
      .with_conn(move |conn| {
        queries::load_assignments(conn, "WHERE candidate_id = ?1", [id_str])
      })
      .await
  }

  async fn searching_assignments(
    &self,
    role_id: Uuid,
    seniority: Seniority,
  ) -> Result<Vec<ResourceAssignment>> {
    let role_str = encode_uuid(role_id);
    let seniority_str = seniority.as_ref().to_owned();
    self
      .with_conn(move |conn| {
        queries::load_assignments(
          conn,
          "WHERE booking_status = 'searching' AND role_id = ?1 AND required_seniority = ?2",
          params![role_str, seniority_str],
        )
      })
      .await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn record_notifications(
    &self,
    assignment_id: Uuid,
    candidate_ids: Vec<Uuid>,
  ) -> Result<Vec<MatchNotification>> {
    self
      .with_conn(move |conn| {
        queries::record_notifications(conn, assignment_id, candidate_ids)
      })
      .await
  }

  async fn notifications_for(&self, candidate_id: Uuid) -> Result<Vec<MatchNotification>> {
    self
      .query_list(
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM match_notifications
           WHERE candidate_id = ?1 ORDER BY rowid"
        ),
        Some(encode_uuid(candidate_id)),
        RawNotification::from_row,
        RawNotification::into_notification,
      )
      .await
  }

  async fn undelivered_notifications(&self, limit: usize) -> Result<Vec<MatchNotification>> {
    self
      .query_list(
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM match_notifications
           WHERE delivered_at IS NULL
             AND assignment_id IN (
               SELECT assignment_id FROM resource_assignments
               WHERE booking_status = 'searching'
             )
           ORDER BY rowid LIMIT {limit}"
        ),
        None,
        RawNotification::from_row,
        RawNotification::into_notification,
      )
      .await
  }

  async fn mark_notifications_delivered(&self, notification_ids: Vec<Uuid>) -> Result<()> {
    self
      .with_conn(move |conn| queries::mark_notifications_delivered(conn, notification_ids))
      .await
  }

  // ── Fan-out outbox ────────────────────────────────────────────────────────

  async fn pending_fanout_jobs(&self, limit: usize) -> Result<Vec<FanoutJob>> {
    self
      .query_list(
        format!(
          "SELECT {JOB_COLUMNS} FROM fanout_jobs
           WHERE state = 'pending' ORDER BY rowid LIMIT {limit}"
        ),
        None,
        RawJob::from_row,
        RawJob::into_job,
      )
      .await
  }

  async fn get_fanout_job(&self, job_id: Uuid) -> Result<Option<FanoutJob>> {
    Ok(
      self
        .query_list(
          format!("SELECT {JOB_COLUMNS} FROM fanout_jobs WHERE job_id = ?1"),
          Some(encode_uuid(job_id)),
          RawJob::from_row,
          RawJob::into_job,
        )
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn complete_fanout_job(&self, job_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(job_id);
    let at_str = encode_dt(Utc::now());
    self
      .with_conn(move |conn| {
        let changed = conn.execute(
          "UPDATE fanout_jobs SET state = 'done', updated_at = ?1 WHERE job_id = ?2",
          params![at_str, id_str],
        )?;
        if changed == 0 {
          return Err(Error::JobNotFound(job_id));
        }
        Ok(())
      })
      .await
  }

  async fn fail_fanout_job(
    &self,
    job_id: Uuid,
    error: String,
    max_attempts: u32,
  ) -> Result<FanoutJobState> {
    self
      .with_conn(move |conn| queries::fail_fanout_job(conn, job_id, &error, max_attempts))
      .await
  }
}
