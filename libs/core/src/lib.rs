//! Pushbridge core contracts and value types.
//!
//! This crate exposes the data structures exchanged between the event bus,
//! the per-provider registry servers, and the transport clients: the message
//! model, the delivery-status vocabulary, the wire packet envelope, push
//! addresses, and the shared delivery lifecycle that schedules retries until
//! a message is confirmed.
pub mod address;
pub mod config;
pub mod lifecycle;
pub mod message;
pub mod packet;
pub mod status;

pub use address::*;
pub use config::*;
pub use lifecycle::*;
pub use message::*;
pub use packet::*;
pub use status::*;
