//! Typed in-process event bus.
//!
//! Delivery is fan-out: every subscriber observes every event in publish
//! order. Publishing never blocks and never fails; events published while
//! nobody is subscribed are dropped. A subscriber that falls behind the
//! channel capacity skips the overwritten events and keeps going.

use pushbridge_core::{ClientStatus, FcmRegistration, Message, WebPushRegistration};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

pub const DEFAULT_CAPACITY: usize = 256;

/// Everything that travels on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A recipient wants push delivery via FCM.
    RegisterFcm(FcmRegistration),
    /// A recipient wants push delivery via Web Push.
    RegisterWebPush(WebPushRegistration),
    /// A new outbound message to route.
    MessageStart(Message),
    /// Cross-transport delivery-status propagation. `ClientStatus::Ok` is
    /// the universal stop-retrying signal.
    MessageClientStatus {
        name: String,
        mid: String,
        status: ClientStatus,
    },
    /// FCM reported the notification reached the device.
    MessageFcmCallback { mid: String, name: String },
    /// The push service reported the notification reached the device.
    MessageWebPushCallback { mid: String, name: String },
    /// Diagnostic text for a recipient's requesting connection.
    Info { name: String, text: String },
}

/// Handle to the bus. Cheap to clone; every clone publishes into the same
/// channel.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to every current subscriber.
    pub fn publish(&self, event: Event) {
        // With no subscribers there is nobody to deliver to; that is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Subscribes a [`Recorder`] capturing every event published from now on.
    pub fn recorder(&self) -> Recorder {
        Recorder {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Test helper: collects the events a subscriber would have observed.
pub struct Recorder {
    rx: broadcast::Receiver<Event>,
}

impl Recorder {
    /// Returns every event received so far without waiting.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
