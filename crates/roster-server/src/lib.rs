//! Roster server: configuration, the HTTP application and the fan-out
//! worker.

use std::{path::PathBuf, time::Duration};

use axum::Router;
use roster_core::{
  BookingEngine,
  fanout::{FanoutDriver, Notifier},
  matching::MatchNotification,
  store::RosterStore,
};
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server configuration, read from `config.toml` and `ROSTER_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub fanout:     FanoutConfig,
}

/// Settings for the background fan-out worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
  /// Pause between polls of the outbox.
  pub interval_ms:  u64,
  pub batch_size:   usize,
  /// Attempts before a job is parked.
  pub max_attempts: u32,
}

impl Default for FanoutConfig {
  fn default() -> Self {
    Self { interval_ms: 1_000, batch_size: 50, max_attempts: 5 }
  }
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/roster/roster.db") }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The full HTTP application: the JSON API under `/api`, with request
/// tracing.
pub fn app<S: RosterStore + 'static>(engine: BookingEngine<S>) -> Router {
  Router::new()
    .nest("/api", roster_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

// ─── Fan-out worker ───────────────────────────────────────────────────────────

/// Hands notifications to the delivery channel by logging them. Email and
/// push delivery live outside this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn request_delivery(&self, notification: &MatchNotification) {
    info!(
      notification_id = %notification.notification_id,
      candidate_id = %notification.candidate_id,
      assignment_id = %notification.assignment_id,
      "match notification ready for delivery"
    );
  }
}

/// Drain the outbox every `interval_ms` until `shutdown` flips to `true`.
pub async fn run_fanout_worker<S, N>(
  driver: FanoutDriver<S, N>,
  config: FanoutConfig,
  mut shutdown: watch::Receiver<bool>,
) where
  S: RosterStore,
  N: Notifier,
{
  let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      changed = shutdown.changed() => {
        if changed.is_err() || *shutdown.borrow() {
          break;
        }
        continue;
      }
    }

    match driver.run_once(config.batch_size).await {
      Ok(report) if report.jobs > 0 || report.notified > 0 => debug!(
        jobs = report.jobs,
        notified = report.notified,
        retried = report.retried,
        parked = report.parked,
        "fan-out pass"
      ),
      Ok(_) => {}
      Err(e) => warn!("fan-out pass failed: {e}"),
    }
  }

  info!("fan-out worker stopped");
}
