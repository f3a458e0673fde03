//! Rendezvous session simulator
//!
//! Usage: `rendezvous-sim [clients] [keyword]`. Prints the report as JSON.

use std::env;

use rendezvous_sim::SimConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rendezvous_sim=info,rendezvous=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SimConfig::from_env();
    if let Some(clients) = args.get(1).and_then(|s| s.parse().ok()) {
        config.clients = clients;
    }
    if let Some(keyword) = args.get(2) {
        config.keyword = keyword.clone();
    }

    let report = rendezvous_sim::run(config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
