use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use pushbridge_bus::{Bus, Event};
use pushbridge_core::{ClientStatus, Delivery, Message, Packet, PushClient};
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum FcmError {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fcm returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Options shared by every FCM client of one registry: a single HTTP client
/// (proxy already applied) and the server credentials.
pub struct FcmOptions {
    http: reqwest::Client,
    server_key: String,
    api_base: String,
}

impl FcmOptions {
    pub fn new(
        server_key: String,
        api_base: String,
        proxy: Option<&str>,
    ) -> Result<Self, FcmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            http: builder.build()?,
            server_key,
            api_base,
        })
    }
}

/// Per-recipient FCM delivery client.
///
/// The in-flight flag serializes provider calls for this recipient: an
/// attempt that finds the flag set is dropped, not queued, and the retry
/// schedule makes the next one.
pub struct FcmClient {
    delivery: Delivery,
    token: RwLock<String>,
    in_flight: AtomicBool,
    bus: Bus,
    options: Arc<FcmOptions>,
}

impl FcmClient {
    pub fn new(token: String, delivery: Delivery, bus: Bus, options: Arc<FcmOptions>) -> Self {
        Self {
            delivery,
            token: RwLock::new(token),
            in_flight: AtomicBool::new(false),
            bus,
            options,
        }
    }

    /// Re-registration swaps the device token in place. Identity, group,
    /// and pending schedules stay as they are.
    pub fn update_token(&self, token: String) {
        *self.token.write().unwrap() = token;
    }

    fn publish_status(&self, mid: &str, status: ClientStatus) {
        self.bus.publish(Event::MessageClientStatus {
            name: self.delivery.name().to_string(),
            mid: mid.to_string(),
            status,
        });
    }

    async fn post_packet(&self, packet: &Packet) -> Result<(), FcmError> {
        let token = self.token.read().unwrap().clone();
        let response = self
            .options
            .http
            .post(send_url(&self.options.api_base))
            .header(AUTHORIZATION, format!("key={}", self.options.server_key))
            .json(&envelope_body(packet, &token))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FcmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PushClient for FcmClient {
    fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    async fn send(&self, message: &Message) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // A call for this recipient is outstanding; drop the attempt and
            // let the retry schedule make the next one.
            return;
        }

        self.publish_status(&message.mid, ClientStatus::FcmWait);
        let packet = Packet::Message(message.clone());
        match self.post_packet(&packet).await {
            Ok(()) => {
                self.publish_status(&message.mid, ClientStatus::FcmSend);
                self.delivery.confirm(&message.mid);
            }
            Err(err) => {
                tracing::warn!(
                    name = %self.delivery.name(),
                    mid = %message.mid,
                    error = %err,
                    "fcm send failed"
                );
            }
        }
        self.in_flight.store(false, Ordering::Release);
    }

    fn unregister(&self) {}
}

fn send_url(api_base: &str) -> String {
    format!("{}/fcm/send", api_base.trim_end_matches('/'))
}

fn envelope_body(packet: &Packet, token: &str) -> Value {
    json!({ "data": packet, "to": token })
}
