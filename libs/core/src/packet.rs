use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Envelope placed on the provider wire.
///
/// The same `{cmd, data}` shape travels over every transport in the wider
/// system, so push providers receive the command tag alongside the payload
/// and recipients can dispatch on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", content = "data", rename_all = "UPPERCASE")]
pub enum Packet {
    Message(Message),
    Info(String),
}
