use serde::{Deserialize, Serialize};

/// Delivery-progress vocabulary published on the bus.
///
/// `Ok` is the universal stop-retrying signal, regardless of which transport
/// produced it. The remaining variants are provider-scoped progress markers.
/// The wire spellings are load-bearing; `webpush-ok-comfirm` is spelled the
/// way it appears on the wire.
///
/// ```
/// use pushbridge_core::ClientStatus;
///
/// assert_eq!(ClientStatus::Ok.as_str(), "ok");
/// assert_eq!(ClientStatus::WebpushOkComfirm.as_str(), "webpush-ok-comfirm");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClientStatus {
    Ok,
    FcmWait,
    FcmSend,
    FcmOk,
    WebpushWait,
    WebpushOk,
    WebpushOkComfirm,
}

impl ClientStatus {
    /// Returns the wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Ok => "ok",
            ClientStatus::FcmWait => "fcm-wait",
            ClientStatus::FcmSend => "fcm-send",
            ClientStatus::FcmOk => "fcm-ok",
            ClientStatus::WebpushWait => "webpush-wait",
            ClientStatus::WebpushOk => "webpush-ok",
            ClientStatus::WebpushOkComfirm => "webpush-ok-comfirm",
        }
    }
}
