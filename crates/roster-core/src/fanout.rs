//! Fan-out outbox and the driver that drains it.
//!
//! `open`, `decline` and `withdraw` enqueue a [`FanoutJob`] in the same
//! atomic unit as the state change. [`FanoutDriver::run_once`] later runs the
//! Matching Index for each job, then hands every undelivered notification to
//! the [`Notifier`], whichever path recorded it. Failures are retried on the
//! next run and never touch the assignment; delivery is at-least-once and
//! notification inserts are idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{engine::BookingEngine, matching::MatchNotification, store::RosterStore};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FanoutJobState {
  Pending,
  Done,
  /// Gave up after too many failed attempts.
  Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutJob {
  pub job_id:        Uuid,
  pub assignment_id: Uuid,
  pub state:         FanoutJobState,
  pub attempts:      u32,
  pub last_error:    Option<String>,
  pub enqueued_at:   DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Hands an undelivered notification to the delivery collaborator.
pub trait Notifier: Send + Sync {
  fn request_delivery(&self, notification: &MatchNotification);
}

/// Counters for one [`FanoutDriver::run_once`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
  pub jobs:     usize,
  pub notified: usize,
  pub retried:  usize,
  pub parked:   usize,
}

pub struct FanoutDriver<S, N> {
  engine:       BookingEngine<S>,
  notifier:     N,
  max_attempts: u32,
}

impl<S: RosterStore, N: Notifier> FanoutDriver<S, N> {
  pub fn new(engine: BookingEngine<S>, notifier: N, max_attempts: u32) -> Self {
    Self { engine, notifier, max_attempts: max_attempts.max(1) }
  }

  /// Process up to `batch` pending jobs, then deliver up to `batch`
  /// undelivered notifications.
  ///
  /// Returns an error only when the outbox itself cannot be read or updated;
  /// the affected job then stays pending.
  pub async fn run_once(&self, batch: usize) -> Result<FanoutReport, S::Error> {
    let store = self.engine.store();
    let jobs = store.pending_fanout_jobs(batch).await?;
    let mut report = FanoutReport::default();

    for job in jobs {
      report.jobs += 1;
      match self.engine.fan_out(job.assignment_id).await {
        Ok(Ok(_)) => {
          store.complete_fanout_job(job.job_id).await?;
        }
        Ok(Err(e)) => {
          warn!(job_id = %job.job_id, assignment_id = %job.assignment_id, "dropping fan-out job: {e}");
          store.complete_fanout_job(job.job_id).await?;
        }
        Err(e) => {
          warn!(
            job_id = %job.job_id,
            assignment_id = %job.assignment_id,
            attempt = job.attempts + 1,
            "fan-out failed: {e}"
          );
          let state = store
            .fail_fanout_job(job.job_id, e.to_string(), self.max_attempts)
            .await?;
          if state == FanoutJobState::Dead {
            error!(job_id = %job.job_id, assignment_id = %job.assignment_id, "fan-out job parked");
            report.parked += 1;
          } else {
            report.retried += 1;
          }
        }
      }
    }

    report.notified = self.deliver(batch).await?;
    Ok(report)
  }

  /// Notifications are stamped only after the request, so a crash in
  /// between repeats the request rather than losing it.
  async fn deliver(&self, batch: usize) -> Result<usize, S::Error> {
    let store = self.engine.store();
    let pending = store.undelivered_notifications(batch).await?;
    if pending.is_empty() {
      return Ok(0);
    }
    for notification in &pending {
      self.notifier.request_delivery(notification);
    }
    let ids = pending.iter().map(|n| n.notification_id).collect();
    store.mark_notifications_delivered(ids).await?;
    Ok(pending.len())
  }
}
