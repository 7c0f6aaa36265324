use serde::{Deserialize, Serialize};

/// Browser Web Push subscription descriptor, as handed out by
/// `PushManager.subscribe()` on the client side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Key material accompanying a Web Push subscription (base64url).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Request to deliver to a recipient through FCM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FcmRegistration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub token: String,
}

/// Request to deliver to a recipient through Web Push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebPushRegistration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(rename = "pushSubscription")]
    pub subscription: PushSubscription,
}
