//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by a [`BookingEngine`] over any
//! [`roster_core::store::RosterStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(engine.clone()))
//! ```

pub mod assignments;
pub mod candidates;
pub mod error;
pub mod projects;
pub mod registry;

use axum::{
  Router,
  routing::{get, post},
};
use roster_core::{BookingEngine, store::RosterStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: BookingEngine<S>) -> Router<()>
where
  S: RosterStore + 'static,
{
  Router::new()
    // Registry
    .route("/roles", get(registry::list_roles::<S>).post(registry::create_role::<S>))
    .route("/roles/{id}", get(registry::get_role::<S>))
    .route(
      "/languages",
      get(registry::list_languages::<S>).post(registry::create_language::<S>),
    )
    .route(
      "/expertises",
      get(registry::list_expertises::<S>).post(registry::create_expertise::<S>),
    )
    // Projects
    .route("/projects", post(projects::create::<S>))
    .route("/projects/{id}", get(projects::get_one::<S>))
    // Assignments
    .route("/assignments", post(assignments::create::<S>))
    .route("/assignments/{id}", get(assignments::get_one::<S>))
    .route("/assignments/{id}/open", post(assignments::open::<S>))
    .route("/assignments/{id}/accept", post(assignments::accept::<S>))
    .route("/assignments/{id}/decline", post(assignments::decline::<S>))
    .route("/assignments/{id}/withdraw", post(assignments::withdraw::<S>))
    .route("/assignments/{id}/eligible", get(assignments::eligible::<S>))
    .route("/assignments/{id}/history", get(assignments::history::<S>))
    // Candidates
    .route(
      "/candidates/{id}",
      get(candidates::get_one::<S>).put(candidates::upsert::<S>),
    )
    .route("/candidates/{id}/availability", post(candidates::set_availability::<S>))
    .route("/candidates/{id}/visible", get(candidates::visible::<S>))
    .route("/candidates/{id}/notifications", get(candidates::notifications::<S>))
    .route("/candidates/{id}/history", get(candidates::history::<S>))
    .with_state(engine)
}
