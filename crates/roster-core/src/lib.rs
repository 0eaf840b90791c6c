//! Core types and logic for the Roster staffing engine.
//!
//! Candidates are matched onto the resource assignments of a project, and
//! every booking change runs through a small state machine. The matching,
//! planning and visibility rules are pure functions; persistence is reached
//! only through the [`store::RosterStore`] trait.
//!
//! This crate has no HTTP or database dependencies.

// Store implementations write native `async fn`; the trait spells out `Send`.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod booking;
pub mod candidate;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod matching;
pub mod project;
pub mod registry;
pub mod store;
pub mod visibility;

pub use engine::BookingEngine;
pub use error::{BookingError, Entity, Outcome};
