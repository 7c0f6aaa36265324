use anyhow::Result;
use pushbridge_bus::Bus;
use pushbridge_fcm::FcmServer;
use pushbridge_gateway::{GatewayConfig, build_router};
use pushbridge_webpush::WebPushServer;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::from_env()?;
    let bus = Bus::new(config.bus_capacity);

    FcmServer::new(bus.clone(), &config.providers.fcm)?.spawn();
    WebPushServer::new(bus.clone(), &config.providers.webpush)?.spawn();

    let listener = TcpListener::bind(config.bind).await?;
    info!("pushbridge gateway listening on {}", config.bind);
    axum::serve(listener, build_router(bus))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
