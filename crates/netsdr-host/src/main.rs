//! # NetSDR host
//!
//! Connects to a NetSDR receiver, runs the setup sequence, optionally tunes
//! it, and records the IQ stream to a file.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (netsdr.toml in the working directory if present)
//! netsdr
//!
//! # Point at a receiver via environment variables
//! NETSDR_HOST=192.168.1.50 NETSDR_PORT=50000 netsdr
//! ```

mod config;

use anyhow::{Context, Result};
use netsdr_client::{FileSampleSink, ProtocolClient};
use netsdr_transport::{TcpTransport, UdpTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netsdr_host=info,netsdr_client=info,netsdr_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    info!(
        "Connecting to receiver at {}, IQ data on UDP port {}",
        config.tcp_addr(),
        config.udp_port
    );

    let sink = Arc::new(
        FileSampleSink::open(&config.output.samples_path).with_context(|| {
            format!(
                "Failed to open sample file: {}",
                config.output.samples_path.display()
            )
        })?,
    );
    let tcp = Arc::new(TcpTransport::new(config.tcp_addr()));
    let udp = Arc::new(UdpTransport::on_port(config.udp_port));
    let client = ProtocolClient::with_config(tcp, udp, sink.clone(), config.client_config());

    client
        .connect()
        .await
        .context("Failed to connect to receiver")?;

    if let Some(hz) = config.receiver.frequency_hz {
        client.change_frequency(hz, config.receiver.channel).await?;
        info!("Tuned channel {} to {} Hz", config.receiver.channel, hz);
    }

    client.start_iq().await?;

    match config.output.stream_seconds {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Interrupted");
        }
    }

    if let Err(e) = client.stop_iq().await {
        warn!("Failed to stop receiver cleanly: {}", e);
    }
    client.shutdown().await;
    sink.flush()?;

    info!("Samples written to {}", sink.path().display());
    Ok(())
}
