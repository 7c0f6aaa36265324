//! Web Push transport: registry server and per-recipient delivery client.
//!
//! Payloads are encrypted (RFC 8291) and VAPID-signed (RFC 8292) with the
//! `web-push` crate; the HTTP request itself is issued through a shared
//! reqwest client so the configured proxy and the `Urgency` header apply.
mod client;
mod server;

pub use client::{WebPushClient, WebPushError, WebPushOptions};
pub use server::WebPushServer;
