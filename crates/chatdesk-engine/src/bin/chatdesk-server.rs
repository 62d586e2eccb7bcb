//! Chatdesk dispatch server binary
//!
//! Bootstraps tracing, builds the engine with the default configuration,
//! and serves the HTTP surface until interrupted.

use chatdesk_engine::prelude::*;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DispatchConfig::default();
    let server = DispatchServerBuilder::new().with_config(config).build().await?;

    let engine = server.engine().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Interrupt received; shutting down");
            engine.shutdown();
            std::process::exit(0);
        }
    });

    server.run().await?;
    Ok(())
}
