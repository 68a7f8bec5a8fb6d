//! Skirmish room relay.

use clap::Parser;
use skirmish_relay::RelayConfig;

#[tokio::main]
async fn main() {
    let config = RelayConfig::parse();
    skirmish_client::logging::init(config.log_format, "info");

    tracing::info!("Starting skirmish relay");
    if let Err(error) = skirmish_relay::run(config).await {
        tracing::error!(%error, "Relay stopped");
        std::process::exit(1);
    }
}
