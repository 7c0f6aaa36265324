//! Firebase Cloud Messaging transport: registry server and per-recipient
//! delivery client for the legacy HTTP `/fcm/send` API.
mod client;
mod server;

pub use client::{FcmClient, FcmError, FcmOptions};
pub use server::FcmServer;
