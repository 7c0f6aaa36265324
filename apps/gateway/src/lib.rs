//! Gateway wiring: configuration, the HTTP trigger surface, and startup.
pub mod config;
pub mod http;

pub use config::GatewayConfig;
pub use http::build_router;
