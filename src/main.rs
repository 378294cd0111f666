use anyhow::Result;
use log::info;
use std::sync::Arc;

use ad_rewards::{
    api::{self, AppState},
    config::{RuntimeConfig, ServiceConfig},
    constants::Env,
    ipfs::PinataClient,
    listings::OpenSeaClient,
    metrics::install_exporter,
    store::MemoryStore,
    utils::setup_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv::dotenv().ok();
    let env = Env::new();
    setup_logger(&env.log_level)?;

    // Load and validate configurations
    let config = ServiceConfig::from_env(&env);
    config.validate_all()?;
    let runtime_config = RuntimeConfig::default();

    install_exporter(runtime_config.metrics_port)?;

    if config.opensea_api_key.is_none() {
        info!("OPENSEA_API_KEY not set, listing routes will report the service as unavailable");
    }
    if config.pinata_api_key.is_none() {
        info!("Pinata keys not set, balance saves will be rejected");
    }

    let state = Arc::new(AppState::new(
        Arc::new(MemoryStore::new()),
        OpenSeaClient::from_config(&config, &runtime_config)?,
        PinataClient::from_config(&config)?,
    ));

    let addr = config.socket_addr()?;
    info!("Serving marketplace API on {}", addr);

    let (_, server) = warp::serve(api::routes(state)).bind_with_graceful_shutdown(addr, async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down");
    });
    server.await;

    Ok(())
}
