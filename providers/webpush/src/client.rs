use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pushbridge_bus::{Bus, Event};
use pushbridge_core::{ClientStatus, Delivery, Message, Packet, PushClient, PushSubscription};
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage, WebPushMessageBuilder,
};

#[derive(Debug, thiserror::Error)]
pub enum WebPushError {
    #[error("encode packet: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("build push message: {0}")]
    Message(#[from] web_push::WebPushError),
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("push service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Options shared by every Web Push client of one registry.
pub struct WebPushOptions {
    pub(crate) http: reqwest::Client,
    pub(crate) vapid_private_key: String,
    pub(crate) subject: String,
    pub(crate) ttl: u32,
}

/// Per-recipient Web Push delivery client.
///
/// Same exclusion policy as the other push transports: one provider call at
/// a time per recipient, losers are dropped and the retry schedule makes the
/// next attempt.
pub struct WebPushClient {
    delivery: Delivery,
    subscription: SubscriptionInfo,
    in_flight: AtomicBool,
    bus: Bus,
    options: Arc<WebPushOptions>,
}

impl WebPushClient {
    pub fn new(
        subscription: PushSubscription,
        delivery: Delivery,
        bus: Bus,
        options: Arc<WebPushOptions>,
    ) -> Self {
        let subscription = SubscriptionInfo::new(
            subscription.endpoint,
            subscription.keys.p256dh,
            subscription.keys.auth,
        );
        Self {
            delivery,
            subscription,
            in_flight: AtomicBool::new(false),
            bus,
            options,
        }
    }

    fn publish_status(&self, mid: &str, status: ClientStatus) {
        self.bus.publish(Event::MessageClientStatus {
            name: self.delivery.name().to_string(),
            mid: mid.to_string(),
            status,
        });
    }

    /// Encrypts and signs the packet, then pushes it to the subscription's
    /// endpoint.
    async fn post_packet(&self, packet: &Packet) -> Result<(), WebPushError> {
        let payload = serde_json::to_vec(packet)?;

        let mut signature = VapidSignatureBuilder::from_base64(
            &self.options.vapid_private_key,
            &self.subscription,
        )?;
        signature.add_claim("sub", self.options.subject.clone());

        let mut builder = WebPushMessageBuilder::new(&self.subscription);
        builder.set_payload(ContentEncoding::Aes128Gcm, &payload);
        builder.set_vapid_signature(signature.build()?);
        builder.set_ttl(self.options.ttl);

        self.dispatch(builder.build()?).await
    }

    async fn dispatch(&self, message: WebPushMessage) -> Result<(), WebPushError> {
        let mut request = self
            .options
            .http
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string())
            .header("Urgency", "high");

        if let Some(payload) = message.payload {
            request = request.header("Content-Encoding", payload.content_encoding.to_str());
            for (key, value) in &payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(payload.content);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebPushError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PushClient for WebPushClient {
    fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    async fn send(&self, message: &Message) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        self.publish_status(&message.mid, ClientStatus::WebpushWait);
        let packet = Packet::Message(message.clone());
        match self.post_packet(&packet).await {
            Ok(()) => {
                self.publish_status(&message.mid, ClientStatus::WebpushOk);
                self.delivery.confirm(&message.mid);
            }
            Err(err) => {
                tracing::warn!(
                    name = %self.delivery.name(),
                    mid = %message.mid,
                    error = %err,
                    "webpush send failed"
                );
            }
        }
        self.in_flight.store(false, Ordering::Release);
    }

    fn unregister(&self) {}
}
