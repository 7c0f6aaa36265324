use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pushbridge_bus::{Bus, Event};
use pushbridge_core::{
    ClientStatus, Delivery, FcmConfig, FcmRegistration, Message, PushClient, SendType,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::client::{FcmClient, FcmError, FcmOptions};

/// Bridges bus events to the per-recipient FCM clients.
///
/// The registry map is owned exclusively by this server; nothing else
/// mutates it. Without credentials the server stays up in disabled mode:
/// registrations are answered with a diagnostic and every other event is
/// ignored, so the other providers keep working.
pub struct FcmServer {
    bus: Bus,
    options: Option<Arc<FcmOptions>>,
    retry_timeout: Duration,
    clients: HashMap<String, Arc<FcmClient>>,
}

impl FcmServer {
    pub fn new(bus: Bus, config: &FcmConfig) -> Result<Self, FcmError> {
        let options = match (&config.server_key, config.is_configured()) {
            (Some(server_key), true) => {
                tracing::info!("fcm server ready");
                Some(Arc::new(FcmOptions::new(
                    server_key.clone(),
                    config.api_base.clone(),
                    config.proxy.as_deref(),
                )?))
            }
            _ => {
                tracing::info!("fcm disabled: credentials missing");
                None
            }
        };
        Ok(Self {
            bus,
            options,
            retry_timeout: config.retry_timeout,
            clients: HashMap::new(),
        })
    }

    /// Subscribes to the bus and consumes events until the task is aborted.
    /// Dropping the returned handle leaves the server running; aborting it
    /// tears the server down.
    pub fn spawn(mut self) -> JoinHandle<()> {
        let mut events = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle(event),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "fcm server lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Applies one bus event to the registry. Kept separate from the run
    /// loop so routing is testable without a live subscription.
    pub fn handle(&mut self, event: Event) {
        if self.options.is_none() {
            if let Event::RegisterFcm(registration) = event {
                self.bus.publish(Event::Info {
                    name: registration.name,
                    text: "fcm is disabled: set FCM_PROJECT_ID, FCM_APPLICATION_ID, \
                           FCM_API_KEY and FCM_SERVER_KEY"
                        .into(),
                });
            }
            return;
        }
        match event {
            Event::RegisterFcm(registration) => self.on_register(registration),
            Event::MessageStart(message) => self.on_message_start(&message),
            Event::MessageClientStatus { name, mid, status } => {
                self.on_client_status(&name, &mid, status)
            }
            Event::MessageFcmCallback { mid, name } => self.on_callback(&mid, &name),
            _ => {}
        }
    }

    fn on_register(&mut self, registration: FcmRegistration) {
        let FcmRegistration { name, group, token } = registration;
        if let Some(client) = self.clients.get(&name) {
            tracing::info!(%name, "fcm token updated");
            client.update_token(token);
            return;
        }
        let Some(options) = self.options.clone() else {
            return;
        };
        tracing::info!(%name, "fcm recipient registered");
        let delivery = Delivery::new(name.clone(), group, self.retry_timeout);
        let client = Arc::new(FcmClient::new(token, delivery, self.bus.clone(), options));
        self.clients.insert(name, client);
    }

    fn on_message_start(&self, message: &Message) {
        match message.send_type {
            SendType::Personal => {
                // A missing recipient is not an error: they may be reachable
                // through another transport.
                if let Some(client) = self.clients.get(&message.target) {
                    Arc::clone(client).send_message(message.clone());
                }
            }
            SendType::Group => {
                for client in self.clients.values() {
                    if client.delivery().group() == Some(message.target.as_str()) {
                        Arc::clone(client).send_message(message.clone());
                    }
                }
            }
        }
    }

    fn on_client_status(&self, name: &str, mid: &str, status: ClientStatus) {
        if status != ClientStatus::Ok {
            return;
        }
        if let Some(client) = self.clients.get(name) {
            tracing::debug!(%name, %mid, "confirmed through another transport");
            client.confirm(mid);
        }
    }

    fn on_callback(&self, mid: &str, name: &str) {
        if self.clients.contains_key(name) {
            tracing::debug!(%name, %mid, "fcm delivery receipt");
            self.bus.publish(Event::MessageClientStatus {
                name: name.to_string(),
                mid: mid.to_string(),
                status: ClientStatus::FcmOk,
            });
        }
    }
}
