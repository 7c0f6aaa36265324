use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pushbridge_bus::{Bus, Event};
use pushbridge_core::{
    ClientStatus, Delivery, Message, PushClient, SendType, WebPushConfig, WebPushRegistration,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::client::{WebPushClient, WebPushError, WebPushOptions};

/// Bridges bus events to the per-recipient Web Push clients.
///
/// Unlike FCM, a re-registration replaces the whole client: the new
/// subscription may point at a different push service, so the old instance
/// is discarded along with its schedules.
pub struct WebPushServer {
    bus: Bus,
    options: Option<Arc<WebPushOptions>>,
    retry_timeout: Duration,
    clients: HashMap<String, Arc<WebPushClient>>,
}

impl WebPushServer {
    pub fn new(bus: Bus, config: &WebPushConfig) -> Result<Self, WebPushError> {
        let options = match (&config.vapid, config.is_configured()) {
            (Some(vapid), true) => {
                tracing::info!("webpush server ready");
                let mut builder = reqwest::Client::builder();
                if let Some(proxy) = &config.proxy {
                    builder = builder.proxy(reqwest::Proxy::all(proxy)?);
                }
                Some(Arc::new(WebPushOptions {
                    http: builder.build()?,
                    vapid_private_key: vapid.private_key.clone(),
                    subject: config.subject.clone(),
                    ttl: config.ttl,
                }))
            }
            _ => {
                tracing::info!("webpush disabled: credentials missing");
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
    pub fn spawn(mut self) -> JoinHandle<()> {
        let mut events = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle(event),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "webpush server lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Applies one bus event to the registry.
    pub fn handle(&mut self, event: Event) {
        if self.options.is_none() {
            if let Event::RegisterWebPush(registration) = event {
                self.bus.publish(Event::Info {
                    name: registration.name,
                    text: "webpush is disabled: set WEBPUSH_API_KEY, \
                           WEBPUSH_VAPID_PUBLIC_KEY and WEBPUSH_VAPID_PRIVATE_KEY"
                        .into(),
                });
            }
            return;
        }
        match event {
            Event::RegisterWebPush(registration) => self.on_register(registration),
            Event::MessageStart(message) => self.on_message_start(&message),
            Event::MessageClientStatus { name, mid, status } => {
                self.on_client_status(&name, &mid, status)
            }
            Event::MessageWebPushCallback { mid, name } => self.on_callback(&mid, &name),
            _ => {}
        }
    }

    fn on_register(&mut self, registration: WebPushRegistration) {
        let Some(options) = self.options.clone() else {
            return;
        };
        let WebPushRegistration {
            name,
            group,
            subscription,
        } = registration;
        if !self.clients.contains_key(&name) {
            tracing::info!(%name, "webpush recipient registered");
        }
        let delivery = Delivery::new(name.clone(), group, self.retry_timeout);
        let client = Arc::new(WebPushClient::new(
            subscription,
            delivery,
            self.bus.clone(),
            options,
        ));
        if let Some(previous) = self.clients.insert(name, client) {
            // The registry can no longer confirm the displaced client, so
            // stop its schedules instead of letting them retry a dead
            // address forever.
            previous.delivery().cancel_all();
        }
    }

    fn on_message_start(&self, message: &Message) {
        match message.send_type {
            SendType::Personal => {
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
            tracing::debug!(%name, %mid, "webpush delivery receipt");
            self.bus.publish(Event::MessageClientStatus {
                name: name.to_string(),
                mid: mid.to_string(),
                status: ClientStatus::WebpushOkComfirm,
            });
        }
    }
}
