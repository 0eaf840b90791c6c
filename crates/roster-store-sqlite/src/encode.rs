//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their snake_case `strum` names.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use roster_core::{
  assignment::ResourceAssignment,
  booking::BookingEvent,
  candidate::CandidateProfile,
  fanout::FanoutJob,
  matching::MatchNotification,
  project::Project,
  registry::{Expertise, Language, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> { id.map(encode_uuid) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode a `strum`-named enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

pub fn decode_id_set(ids: Vec<String>) -> Result<BTreeSet<Uuid>> {
  ids.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ROLE_COLUMNS: &str = "role_id, name, automated, created_at";

/// Raw strings read directly from a `roles` row.
pub struct RawRole {
  pub role_id:    String,
  pub name:       String,
  pub automated:  bool,
  pub created_at: String,
}

impl RawRole {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      role_id:    row.get(0)?,
      name:       row.get(1)?,
      automated:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      role_id:    decode_uuid(&self.role_id)?,
      name:       self.name,
      automated:  self.automated,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub fn language_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String)> {
  Ok((row.get(0)?, row.get(1)?))
}

pub fn into_language((id, name): (String, String)) -> Result<Language> {
  Ok(Language { language_id: decode_uuid(&id)?, name })
}

pub fn into_expertise((id, name): (String, String)) -> Result<Expertise> {
  Ok(Expertise { expertise_id: decode_uuid(&id)?, name })
}

pub const PROJECT_COLUMNS: &str = "project_id, owner_id, status, created_at";

pub struct RawProject {
  pub project_id: String,
  pub owner_id:   String,
  pub status:     String,
  pub created_at: String,
}

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id: row.get(0)?,
      owner_id:   row.get(1)?,
      status:     row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id: decode_uuid(&self.project_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      status:     decode_enum("projects.status", &self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const ASSIGNMENT_COLUMNS: &str = "assignment_id, project_id, role_id, \
  required_seniority, booking_status, candidate_id, price_cents, created_at, \
  updated_at";

/// Raw strings read from a `resource_assignments` row. The membership sets
/// are loaded separately.
pub struct RawAssignment {
  pub assignment_id:      String,
  pub project_id:         String,
  pub role_id:            String,
  pub required_seniority: String,
  pub booking_status:     String,
  pub candidate_id:       Option<String>,
  pub price_cents:        Option<i64>,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id:      row.get(0)?,
      project_id:         row.get(1)?,
      role_id:            row.get(2)?,
      required_seniority: row.get(3)?,
      booking_status:     row.get(4)?,
      candidate_id:       row.get(5)?,
      price_cents:        row.get(6)?,
      created_at:         row.get(7)?,
      updated_at:         row.get(8)?,
    })
  }

  pub fn into_assignment(
    self,
    required_languages: BTreeSet<Uuid>,
    required_expertises: BTreeSet<Uuid>,
  ) -> Result<ResourceAssignment> {
    Ok(ResourceAssignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      project_id: decode_uuid(&self.project_id)?,
      role_id: decode_uuid(&self.role_id)?,
      required_seniority: decode_enum(
        "resource_assignments.required_seniority",
        &self.required_seniority,
      )?,
      required_languages,
      required_expertises,
      booking_status: decode_enum(
        "resource_assignments.booking_status",
        &self.booking_status,
      )?,
      candidate_id: decode_opt_uuid(self.candidate_id.as_deref())?,
      price_cents: self.price_cents,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const CANDIDATE_COLUMNS: &str =
  "candidate_id, role_id, seniority, availability, updated_at";

pub struct RawCandidate {
  pub candidate_id: String,
  pub role_id:      Option<String>,
  pub seniority:    Option<String>,
  pub availability: String,
  pub updated_at:   String,
}

impl RawCandidate {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      candidate_id: row.get(0)?,
      role_id:      row.get(1)?,
      seniority:    row.get(2)?,
      availability: row.get(3)?,
      updated_at:   row.get(4)?,
    })
  }

  /// Unparseable `role_id` or `seniority` values decode as absent: upstream
  /// profiles may be incomplete and must read as ineligible, not as errors.
  pub fn into_candidate(
    self,
    languages: BTreeSet<Uuid>,
    expertises: BTreeSet<Uuid>,
  ) -> Result<CandidateProfile> {
    Ok(CandidateProfile {
      candidate_id: decode_uuid(&self.candidate_id)?,
      role_id: self.role_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
      seniority: self.seniority.as_deref().and_then(|s| s.parse().ok()),
      availability: decode_enum("candidates.availability", &self.availability)?,
      languages,
      expertises,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const EVENT_COLUMNS: &str = "event_id, assignment_id, transition, \
  from_status, to_status, candidate_id, recorded_at";

pub struct RawEvent {
  pub event_id:      String,
  pub assignment_id: String,
  pub transition:    String,
  pub from_status:   String,
  pub to_status:     String,
  pub candidate_id:  Option<String>,
  pub recorded_at:   String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:      row.get(0)?,
      assignment_id: row.get(1)?,
      transition:    row.get(2)?,
      from_status:   row.get(3)?,
      to_status:     row.get(4)?,
      candidate_id:  row.get(5)?,
      recorded_at:   row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<BookingEvent> {
    Ok(BookingEvent {
      event_id:      decode_uuid(&self.event_id)?,
      assignment_id: decode_uuid(&self.assignment_id)?,
      transition:    decode_enum("booking_events.transition", &self.transition)?,
      from:          decode_enum("booking_events.from_status", &self.from_status)?,
      to:            decode_enum("booking_events.to_status", &self.to_status)?,
      candidate_id:  decode_opt_uuid(self.candidate_id.as_deref())?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "notification_id, candidate_id, assignment_id, created_at, delivered_at";

pub struct RawNotification {
  pub notification_id: String,
  pub candidate_id:    String,
  pub assignment_id:   String,
  pub created_at:      String,
  pub delivered_at:    Option<String>,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      candidate_id:    row.get(1)?,
      assignment_id:   row.get(2)?,
      created_at:      row.get(3)?,
      delivered_at:    row.get(4)?,
    })
  }

  pub fn into_notification(self) -> Result<MatchNotification> {
    Ok(MatchNotification {
      notification_id: decode_uuid(&self.notification_id)?,
      candidate_id:    decode_uuid(&self.candidate_id)?,
      assignment_id:   decode_uuid(&self.assignment_id)?,
      created_at:      decode_dt(&self.created_at)?,
      delivered_at:    self.delivered_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const JOB_COLUMNS: &str = "job_id, assignment_id, state, attempts, \
  last_error, enqueued_at, updated_at";

pub struct RawJob {
  pub job_id:        String,
  pub assignment_id: String,
  pub state:         String,
  pub attempts:      u32,
  pub last_error:    Option<String>,
  pub enqueued_at:   String,
  pub updated_at:    String,
}

impl RawJob {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:        row.get(0)?,
      assignment_id: row.get(1)?,
      state:         row.get(2)?,
      attempts:      row.get(3)?,
      last_error:    row.get(4)?,
      enqueued_at:   row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_job(self) -> Result<FanoutJob> {
    Ok(FanoutJob {
      job_id:        decode_uuid(&self.job_id)?,
      assignment_id: decode_uuid(&self.assignment_id)?,
      state:         decode_enum("fanout_jobs.state", &self.state)?,
      attempts:      self.attempts,
      last_error:    self.last_error,
      enqueued_at:   decode_dt(&self.enqueued_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
