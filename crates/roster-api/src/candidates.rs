//! Handlers for `/candidates` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/candidates/:id` | 404 if not found |
//! | `PUT`  | `/candidates/:id` | Body: [`CandidateUpsert`]; replaces the profile |
//! | `POST` | `/candidates/:id/availability` | Body: `{"availability":"paused"}` |
//! | `GET`  | `/candidates/:id/visible` | Assignments the dashboard may show |
//! | `GET`  | `/candidates/:id/notifications` | |
//! | `GET`  | `/candidates/:id/history` | Booking events naming the candidate |

use axum::{
  Json,
  extract::{Path, State},
};
use roster_core::{
  BookingEngine, BookingError, Entity,
  assignment::ResourceAssignment,
  booking::BookingEvent,
  candidate::{Availability, CandidateProfile, CandidateUpsert},
  matching::MatchNotification,
  store::RosterStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

async fn require_candidate<S: RosterStore>(
  engine: &BookingEngine<S>,
  id: Uuid,
) -> Result<CandidateProfile, ApiError> {
  engine
    .store()
    .get_candidate(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| BookingError::NotFound(Entity::Candidate, id).into())
}

/// `GET /candidates/:id`
pub async fn get_one<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CandidateProfile>, ApiError> {
  Ok(Json(require_candidate(&engine, id).await?))
}

/// `PUT /candidates/:id`
pub async fn upsert<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CandidateUpsert>,
) -> Result<Json<CandidateProfile>, ApiError> {
  let profile = engine
    .store()
    .upsert_candidate(id, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
  pub availability: Availability,
}

/// `POST /candidates/:id/availability`
pub async fn set_availability<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AvailabilityBody>,
) -> Result<Json<CandidateProfile>, ApiError> {
  let profile = engine
    .store()
    .set_availability(id, body.availability)
    .await
    .map_err(ApiError::store)??;
  Ok(Json(profile))
}

/// `GET /candidates/:id/visible`
pub async fn visible<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ResourceAssignment>>, ApiError> {
  let assignments = engine
    .visible_assignments(id)
    .await
    .map_err(ApiError::store)??;
  Ok(Json(assignments))
}

/// `GET /candidates/:id/notifications`
pub async fn notifications<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<MatchNotification>>, ApiError> {
  require_candidate(&engine, id).await?;
  let notifications = engine
    .store()
    .notifications_for(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(notifications))
}

/// `GET /candidates/:id/history`
pub async fn history<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<BookingEvent>>, ApiError> {
  let events = engine
    .store()
    .candidate_history(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}
