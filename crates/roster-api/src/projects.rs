//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/projects` | Body: `{"owner_id":"...","status":"draft"}` |
//! | `GET`  | `/projects/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  BookingEngine,
  project::{NewProject, Project},
  store::RosterStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /projects`
pub async fn create<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
  let project = engine.store().add_project(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /projects/:id`
pub async fn get_one<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
  let project = engine
    .store()
    .get_project(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
  Ok(Json(project))
}
