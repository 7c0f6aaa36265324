use std::net::SocketAddr;

use anyhow::{Context, Result};
use pushbridge_core::Config;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub bus_capacity: usize,
    pub providers: Config,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let bind = std::env::var("BIND").unwrap_or_else(|_| "0.0.0.0:8090".into());
        let bind = bind
            .parse()
            .with_context(|| format!("invalid BIND address: {bind}"))?;
        let bus_capacity = std::env::var("BUS_CAPACITY")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(pushbridge_bus::DEFAULT_CAPACITY);
        Ok(Self {
            bind,
            bus_capacity,
            providers: Config::from_env(),
        })
    }
}
