//! Handlers for `/assignments` endpoints: intake, the four booking
//! transitions, and the matching read.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/assignments` | Body: [`NewAssignment`]; created in `draft` |
//! | `GET`  | `/assignments/:id` | 404 if not found |
//! | `POST` | `/assignments/:id/open` | |
//! | `POST` | `/assignments/:id/accept` | Body: `{"candidate_id":"..."}` |
//! | `POST` | `/assignments/:id/decline` | Body: `{"candidate_id":"..."}` |
//! | `POST` | `/assignments/:id/withdraw` | |
//! | `GET`  | `/assignments/:id/eligible` | Ids of eligible candidates |
//! | `GET`  | `/assignments/:id/history` | Booking events, oldest first |
//!
//! A transition answers `409` when it lost a race (`code: "conflict"`) or when
//! the current status does not allow it (`code: "invalid_transition"`).

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  BookingEngine, BookingError,
  assignment::{NewAssignment, ResourceAssignment},
  booking::{BookingEvent, TransitionReceipt},
  store::RosterStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Intake ───────────────────────────────────────────────────────────────────

/// `POST /assignments`
pub async fn create<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Json(body): Json<NewAssignment>,
) -> Result<impl IntoResponse, ApiError> {
  let assignment = engine
    .store()
    .add_assignment(body)
    .await
    .map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(assignment)))
}

/// `GET /assignments/:id`
pub async fn get_one<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ResourceAssignment>, ApiError> {
  let assignment = engine
    .store()
    .get_assignment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("assignment {id} not found")))?;
  Ok(Json(assignment))
}

// ─── Transitions ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CandidateBody {
  pub candidate_id: Uuid,
}

/// `POST /assignments/:id/open`
pub async fn open<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TransitionReceipt>, ApiError> {
  let receipt = engine.open(id).await.map_err(ApiError::store)??;
  Ok(Json(receipt))
}

/// `POST /assignments/:id/accept`
///
/// A losing accept gets the candidate's refreshed visible list along with
/// the `409`, so the dashboard can drop the slot without another round trip.
pub async fn accept<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CandidateBody>,
) -> Result<Json<TransitionReceipt>, ApiError> {
  match engine.accept(id, body.candidate_id).await.map_err(ApiError::store)? {
    Ok(receipt) => Ok(Json(receipt)),
    Err(e @ BookingError::Conflict) => {
      let visible = engine
        .visible_assignments(body.candidate_id)
        .await
        .map_err(ApiError::store)?
        .ok();
      Err(ApiError::Conflict { message: e.to_string(), visible })
    }
    Err(e) => Err(e.into()),
  }
}

/// `POST /assignments/:id/decline`
pub async fn decline<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CandidateBody>,
) -> Result<Json<TransitionReceipt>, ApiError> {
  let receipt = engine
    .decline(id, body.candidate_id)
    .await
    .map_err(ApiError::store)??;
  Ok(Json(receipt))
}

/// `POST /assignments/:id/withdraw`
pub async fn withdraw<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TransitionReceipt>, ApiError> {
  let receipt = engine.withdraw(id).await.map_err(ApiError::store)??;
  Ok(Json(receipt))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EligibleResponse {
  pub assignment_id: Uuid,
  pub candidates:    Vec<Uuid>,
}

/// `GET /assignments/:id/eligible`
pub async fn eligible<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EligibleResponse>, ApiError> {
  let candidates = engine
    .find_eligible_candidates(id)
    .await
    .map_err(ApiError::store)??;
  Ok(Json(EligibleResponse {
    assignment_id: id,
    candidates:    candidates.into_iter().collect(),
  }))
}

/// `GET /assignments/:id/history`
pub async fn history<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<BookingEvent>>, ApiError> {
  let store = engine.store();
  if store.get_assignment(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("assignment {id} not found")));
  }
  let events = store.booking_history(id).await.map_err(ApiError::store)?;
  Ok(Json(events))
}
