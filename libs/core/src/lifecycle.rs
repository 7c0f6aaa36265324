//! Shared delivery lifecycle: retry scheduling and confirmation.
//!
//! Every transport client embeds a [`Delivery`] and implements
//! [`PushClient::send`], one best-effort provider attempt. Scheduling,
//! confirmation, and teardown live here so no transport duplicates them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::message::Message;

/// Per-recipient delivery state: identity, retry cadence, and the set of
/// message ids still awaiting confirmation.
///
/// Confirmation is the only cancellation primitive. It stops future attempts
/// for a `mid` but never interrupts an attempt already in flight.
pub struct Delivery {
    name: String,
    group: Option<String>,
    retry_timeout: Duration,
    pending: DashMap<String, watch::Sender<()>>,
}

impl Delivery {
    pub fn new(name: impl Into<String>, group: Option<String>, retry_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            group,
            retry_timeout,
            pending: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Whether `mid` still has an active retry schedule.
    pub fn is_pending(&self, mid: &str) -> bool {
        self.pending.contains_key(mid)
    }

    /// Stops future attempts for `mid`. Idempotent; unknown ids are ignored.
    /// Returns whether a schedule existed.
    pub fn confirm(&self, mid: &str) -> bool {
        // Dropping the sender wakes the retry task parked on the receiver.
        self.pending.remove(mid).is_some()
    }

    /// Stops every pending schedule for this recipient.
    pub fn cancel_all(&self) {
        self.pending.clear();
    }

    /// Registers `mid` for repeated attempts. Returns `None` when a schedule
    /// already exists.
    fn begin(&self, mid: &str) -> Option<watch::Receiver<()>> {
        match self.pending.entry(mid.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(());
                slot.insert(tx);
                Some(rx)
            }
        }
    }
}

/// A per-recipient transport client.
///
/// Implementations provide one provider attempt via [`PushClient::send`] and
/// report failures themselves; the provided methods drive the attempt until
/// the message is confirmed.
#[async_trait]
pub trait PushClient: Send + Sync + 'static {
    /// Shared lifecycle state for this recipient.
    fn delivery(&self) -> &Delivery;

    /// One best-effort provider attempt. Must leave the client ready for the
    /// next attempt whatever the outcome.
    async fn send(&self, message: &Message);

    /// Schedules `message` for delivery: one immediate attempt, then one per
    /// retry interval until the `mid` is confirmed. A `mid` that is already
    /// scheduled is left untouched.
    fn send_message(self: Arc<Self>, message: Message)
    where
        Self: Sized,
    {
        let Some(mut confirmed) = self.delivery().begin(&message.mid) else {
            return;
        };
        tokio::spawn(async move {
            loop {
                tracing::debug!(
                    name = %self.delivery().name(),
                    mid = %message.mid,
                    "delivery attempt"
                );
                self.send(&message).await;
                tokio::select! {
                    _ = confirmed.changed() => break,
                    _ = tokio::time::sleep(self.delivery().retry_timeout()) => {}
                }
                if !self.delivery().is_pending(&message.mid) {
                    break;
                }
            }
        });
    }

    /// Stops retrying `mid`. An attempt already in flight is not interrupted.
    fn confirm(&self, mid: &str) {
        self.delivery().confirm(mid);
    }

    /// Drops every pending schedule for this recipient. Push transports
    /// override this with a no-op: their registrations are only ever
    /// replaced, never torn down.
    fn unregister(&self) {
        self.delivery().cancel_all();
    }
}
