use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a message is addressed: a single recipient or every member of a group.
///
/// ```
/// use pushbridge_core::SendType;
///
/// let t: SendType = serde_json::from_str("\"personal\"").unwrap();
/// assert_eq!(t, SendType::Personal);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SendType {
    Personal,
    Group,
}

/// Opaque notification payload, carried end to end without inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageBody {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Immutable unit of work produced upstream.
///
/// The bridge never mutates a message; transports only wrap it in a
/// [`Packet`](crate::Packet) envelope for the provider wire. `mid` is the
/// identity a delivery attempt is tracked and confirmed under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub mid: String,
    pub send_type: SendType,
    pub target: String,
    pub message: MessageBody,
}

impl Message {
    /// Convenience constructor for a personal text message.
    pub fn personal(mid: impl Into<String>, target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            mid: mid.into(),
            send_type: SendType::Personal,
            target: target.into(),
            message: MessageBody {
                text: text.into(),
                ..Default::default()
            },
        }
    }

    /// Convenience constructor for a group text message.
    pub fn group(mid: impl Into<String>, target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            send_type: SendType::Group,
            ..Self::personal(mid, target, text)
        }
    }
}
