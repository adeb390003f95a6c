//! # SLA Sweep
//!
//! Periodic scan that flags jobs open past the policy window.
//!
//! ## Sweep Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SLA Sweep                                        │
//! │                                                                         │
//! │  Every interval:                                                       │
//! │    cutoff = now - policy.max_open_hours                                │
//! │    for each non-CLOSED job whose SLA clock started <= cutoff:          │
//! │        INSERT violation (job, "max_resolution_time")                   │
//! │        ON CONFLICT DO NOTHING                                          │
//! │                                                                         │
//! │  SLA clock = sla_started_at, falling back to created_at.               │
//! │  Idempotent: one violation row per (job, rule), ever. Re-running       │
//! │  the sweep never duplicates a flag.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use gearbox_core::SLA_RULE_MAX_RESOLUTION;
use gearbox_db::Database;

use crate::error::OpsResult;

// =============================================================================
// Policy
// =============================================================================

/// The SLA rules a deployment runs with. A configuration value, not a
/// hardcoded constant: different workshops promise different turnaround.
#[derive(Debug, Clone)]
pub struct SlaPolicy {
    /// A job open longer than this is a violation.
    pub max_open_hours: i64,

    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        SlaPolicy {
            max_open_hours: 72,
            sweep_interval: Duration::from_secs(600),
        }
    }
}

// =============================================================================
// Sweep
// =============================================================================

/// The periodic SLA sweep task.
pub struct SlaSweep {
    db: Database,
    policy: SlaPolicy,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the sweep.
#[derive(Clone)]
pub struct SlaSweepHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SlaSweepHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl SlaSweep {
    /// Creates a new sweep and returns a control handle.
    pub fn new(db: Database, policy: SlaPolicy) -> (Self, SlaSweepHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweep = SlaSweep {
            db,
            policy,
            shutdown_rx,
        };

        (sweep, SlaSweepHandle { shutdown_tx })
    }

    /// Runs the sweep loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            max_open_hours = self.policy.max_open_hours,
            "SLA sweep starting"
        );

        let mut interval = tokio::time::interval(self.policy.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(?e, "SLA sweep failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("SLA sweep shutting down");
                    break;
                }
            }
        }

        info!("SLA sweep stopped");
    }

    /// Runs one sweep pass.
    ///
    /// ## Returns
    /// The number of NEW violations recorded; jobs already flagged for
    /// the rule count zero (the insert is conflict-ignoring).
    pub async fn sweep_once(&self) -> OpsResult<usize> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(self.policy.max_open_hours);

        let overdue = self.db.jobs().list_open_started_before(cutoff).await?;

        if overdue.is_empty() {
            debug!("No jobs past the SLA window");
            return Ok(0);
        }

        let mut recorded = 0;
        for job in &overdue {
            let inserted = self
                .db
                .sla()
                .record_violation(&job.id, SLA_RULE_MAX_RESOLUTION, now)
                .await?;

            if inserted {
                info!(
                    job_number = %job.job_number,
                    open_since = %job.sla_clock_start(),
                    "SLA violation recorded"
                );
                recorded += 1;
            }
        }

        Ok(recorded)
    }
}
