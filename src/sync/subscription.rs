//! Change feed registration.
//!
//! A subscription tails the store's change log for one owner and forwards
//! each entry to the session as a [`SyncEvent::Feed`]. The handshake reads
//! the current log head; only changes committed after it are delivered.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::storage::{Database, DatabaseError, CHANGE_BATCH_SIZE};

use super::error::SyncError;
use super::events::{FeedEvent, SyncEvent};
use super::task::send_event;

/// Active change feed registration.
///
/// Dropping the handle (or calling [`FeedSubscription::release`]) stops the
/// polling task, so a registration can never outlive its owner.
#[derive(Debug)]
pub struct FeedSubscription {
    owner_id: String,
    id: u64,
    handle: JoinHandle<()>,
}

impl FeedSubscription {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Subscription id carried by every event this registration sends.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop delivery. Equivalent to dropping the handle.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!(owner = %self.owner_id, subscription = self.id, "Released change feed subscription");
    }
}

/// Register a change feed for `owner_id`.
///
/// Resolves once the handshake (reading the current log head) has
/// succeeded; after that the returned handle owns a background task that
/// polls every `poll_interval` and sends events to `tx` in store order.
///
/// # Errors
///
/// Returns `SyncError::Subscription` if the log head cannot be read.
pub async fn subscribe_changes(
    db: &Database,
    owner_id: &str,
    subscription_id: u64,
    poll_interval: Duration,
    tx: mpsc::Sender<SyncEvent>,
) -> Result<FeedSubscription, SyncError> {
    let cursor = db
        .change_log_head()
        .await
        .map_err(|e| SyncError::Subscription(e.to_string()))?;

    tracing::info!(owner = %owner_id, subscription = subscription_id, cursor, "Subscribed to change feed");

    let poller = FeedPoller {
        db: db.clone(),
        owner_id: owner_id.to_string(),
        subscription: subscription_id,
        cursor,
        degraded: false,
        tx,
    };
    let handle = tokio::spawn(poller.run(poll_interval));

    Ok(FeedSubscription {
        owner_id: owner_id.to_string(),
        id: subscription_id,
        handle,
    })
}

struct FeedPoller {
    db: Database,
    owner_id: String,
    subscription: u64,
    cursor: i64,
    degraded: bool,
    tx: mpsc::Sender<SyncEvent>,
}

impl FeedPoller {
    async fn run(mut self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.tx.is_closed() {
                break;
            }
            match self.poll().await {
                Ok(()) => {}
                Err(DatabaseError::Closed) => {
                    self.report_degraded("database closed".to_string()).await;
                    break;
                }
                Err(e) => self.report_degraded(e.to_string()).await,
            }
        }

        tracing::debug!(subscription = self.subscription, "Change feed poller stopped");
    }

    /// Drain everything past the cursor, batch by batch.
    async fn poll(&mut self) -> Result<(), DatabaseError> {
        loop {
            let changes = self.db.changes_since(&self.owner_id, self.cursor).await?;

            if self.degraded {
                self.degraded = false;
                tracing::info!(subscription = self.subscription, "Change feed recovered");
                send_event(
                    &self.tx,
                    SyncEvent::FeedRecovered {
                        subscription: self.subscription,
                    },
                    "FeedRecovered",
                )
                .await;
            }

            let batch_len = changes.len();
            for change in changes {
                self.cursor = change.seq;
                let event = SyncEvent::Feed {
                    subscription: self.subscription,
                    seq: change.seq,
                    event: FeedEvent::from(change),
                };
                if self.tx.send(event).await.is_err() {
                    return Ok(());
                }
            }

            if (batch_len as i64) < CHANGE_BATCH_SIZE {
                return Ok(());
            }
        }
    }

    async fn report_degraded(&mut self, error: String) {
        if self.degraded {
            return;
        }
        self.degraded = true;
        tracing::warn!(subscription = self.subscription, error = %error, "Change feed polling failed");
        send_event(
            &self.tx,
            SyncEvent::FeedDegraded {
                subscription: self.subscription,
                error,
            },
            "FeedDegraded",
        )
        .await;
    }
}
