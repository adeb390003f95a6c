//! # Notification Dispatcher
//!
//! Drains the notification outbox and delivers through a pluggable
//! channel.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Dispatcher Flow                                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 notification_outbox Table                       │   │
//! │  │                                                                 │   │
//! │  │  id | recipient    | body          | attempts | sent_at         │   │
//! │  │  ───┼──────────────┼───────────────┼──────────┼─────────        │   │
//! │  │  1  │ +1555...     │ Work on...    │ 0        │ NULL            │   │
//! │  │  2  │ +1555...     │ Your veh...   │ 3        │ NULL            │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  1. Poll: get_pending(batch_size, max_attempts) on an interval         │
//! │     (entries past the retry budget are excluded in SQL, so a dead      │
//! │      entry can never occupy a batch slot)                              │
//! │  2. Send: channel.deliver(recipient, body)                             │
//! │  3. Ok:   mark_sent  (sent_at = NOW)                                   │
//! │  4. Err:  mark_failed (attempts += 1, last_error)                      │
//! │                                                                         │
//! │  Delivery is at-least-once: a crash between deliver and mark_sent      │
//! │  re-sends on the next poll. Transitions never wait for any of this.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use gearbox_db::Database;

use crate::error::OpsResult;

// =============================================================================
// Configuration
// =============================================================================

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How often the outbox is polled.
    pub poll_interval: Duration,

    /// Maximum entries taken per poll.
    pub batch_size: u32,

    /// Delivery attempts before an entry stops being fetched. Exhausted
    /// entries stay in the table (sent_at NULL, last_error set) for
    /// operator inspection.
    pub max_attempts: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 10,
        }
    }
}

// =============================================================================
// Channel
// =============================================================================

/// The outbound delivery seam: SMS gateway, messaging API, whatever the
/// deployment wires in.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers one message. An `Err` string is recorded on the entry and
    /// the delivery retried on a later poll.
    async fn deliver(&self, recipient: &str, body: &str) -> Result<(), String>;
}

/// Default channel that logs instead of sending. Used in development and
/// wherever no real gateway is configured.
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<(), String> {
        info!(recipient = %recipient, body = %body, "Notification (log channel)");
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Drains the notification outbox through a channel.
pub struct NotificationDispatcher {
    /// Database connection.
    db: Database,

    /// Delivery channel.
    channel: Arc<dyn NotificationChannel>,

    /// Dispatch configuration.
    config: DispatchConfig,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl DispatcherHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl NotificationDispatcher {
    /// Creates a new dispatcher and returns a control handle.
    pub fn new(
        db: Database,
        channel: Arc<dyn NotificationChannel>,
        config: DispatchConfig,
    ) -> (Self, DispatcherHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let dispatcher = NotificationDispatcher {
            db,
            channel,
            config,
            shutdown_rx,
        };

        (dispatcher, DispatcherHandle { shutdown_tx })
    }

    /// Runs the dispatcher loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Notification dispatcher starting");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain_once().await {
                        error!(?e, "Failed to drain notification outbox");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Notification dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Notification dispatcher stopped");
    }

    /// Processes one batch of pending entries.
    ///
    /// ## Returns
    /// The number of entries delivered in this pass.
    pub async fn drain_once(&self) -> OpsResult<usize> {
        let entries = self
            .db
            .outbox()
            .get_pending(self.config.batch_size, self.config.max_attempts)
            .await?;

        if entries.is_empty() {
            debug!("No deliverable notifications");
            return Ok(0);
        }

        debug!(count = entries.len(), "Draining notification outbox");

        let mut delivered = 0;
        for entry in entries {
            match self.channel.deliver(&entry.recipient, &entry.body).await {
                Ok(()) => {
                    self.db.outbox().mark_sent(&entry.id).await?;
                    delivered += 1;
                }
                Err(reason) => {
                    warn!(id = %entry.id, reason = %reason, "Notification delivery failed");
                    self.db.outbox().mark_failed(&entry.id, &reason).await?;
                }
            }
        }

        Ok(delivered)
    }
}
