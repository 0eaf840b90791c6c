//! Handlers for the skill/profile registry.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/roles` | |
//! | `POST` | `/roles` | Body: `{"name":"...","automated":false}` |
//! | `GET`  | `/roles/:id` | 404 if not found |
//! | `GET`  | `/languages`, `/expertises` | |
//! | `POST` | `/languages`, `/expertises` | Body: `{"name":"..."}`; a taken name is `409` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  BookingEngine,
  registry::{Expertise, Language, NewRole, Role},
  store::RosterStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

fn require_name(name: &str) -> Result<String, ApiError> {
  let name = name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  Ok(name.to_owned())
}

// ─── Roles ────────────────────────────────────────────────────────────────────

/// `GET /roles`
pub async fn list_roles<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
) -> Result<Json<Vec<Role>>, ApiError> {
  let roles = engine.store().list_roles().await.map_err(ApiError::store)?;
  Ok(Json(roles))
}

/// `POST /roles`
pub async fn create_role<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Json(body): Json<NewRole>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewRole { name: require_name(&body.name)?, ..body };
  let role = engine.store().add_role(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(role)))
}

/// `GET /roles/:id`
pub async fn get_role<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Role>, ApiError> {
  let role = engine
    .store()
    .get_role(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("role {id} not found")))?;
  Ok(Json(role))
}

// ─── Languages and expertises ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /languages`
pub async fn list_languages<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
) -> Result<Json<Vec<Language>>, ApiError> {
  let languages = engine.store().list_languages().await.map_err(ApiError::store)?;
  Ok(Json(languages))
}

/// `POST /languages`
pub async fn create_language<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = require_name(&body.name)?;
  let language = engine
    .store()
    .add_language(name)
    .await
    .map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(language)))
}

/// `GET /expertises`
pub async fn list_expertises<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
) -> Result<Json<Vec<Expertise>>, ApiError> {
  let expertises = engine.store().list_expertises().await.map_err(ApiError::store)?;
  Ok(Json(expertises))
}

/// `POST /expertises`
pub async fn create_expertise<S: RosterStore>(
  State(engine): State<BookingEngine<S>>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = require_name(&body.name)?;
  let expertise = engine
    .store()
    .add_expertise(name)
    .await
    .map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(expertise)))
}
