//! Awqat gateway CLI - fetch prayer times and place lists through the gateway
//!
//! Prints the payload as pretty JSON on stdout. With `--watch` the request is
//! repeated on an interval, served from cache while fresh and from stale data
//! when the upstream API is unavailable.

use chrono::Local;
use clap::Parser;

use awqat_gateway::cli::Cli;
use awqat_gateway::{logging, Gateway, ResourceRequest};

/// Fetches once and prints the payload
async fn fetch_and_print(
    gateway: &Gateway,
    request: &ResourceRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = gateway.fetch(request).await?;
    println!("{}", serde_json::to_string_pretty(&*payload)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Validate the request before touching configuration or the network
    let request = cli.command.to_request(Local::now().date_naive())?;
    let config = cli.gateway_config();
    let gateway = Gateway::new(&config)?;

    let Some(period) = cli.watch_interval() else {
        return fetch_and_print(&gateway, &request).await;
    };

    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A failed round is logged and retried on the next tick
                if let Err(e) = fetch_and_print(&gateway, &request).await {
                    tracing::error!(error = %e, "fetch failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
