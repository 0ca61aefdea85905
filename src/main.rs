// src/main.rs

use color_eyre::eyre::Result;
use std::net::SocketAddr;
use tracing::info;

use privscan_rs::{logging, server};

const DEFAULT_PORT: u16 = 5174;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "Starting compliance scan service.");
    server::serve(addr).await?;
    Ok(())
}
