//! MongoDB Sink Connector for Danube Connect
//!
//! Loads and validates the connector configuration and assembles the sink
//! pipeline, failing fast on any configuration error.

use anyhow::Context;
use danube_sink_mongodb::config::{describe, load_properties};
use danube_sink_mongodb::SinkPipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging first
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,danube_sink_mongodb=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .ok(); // Ignore error if already initialized

    if std::env::args().skip(1).any(|arg| arg == "--describe") {
        println!("{}", describe());
        return Ok(());
    }

    tracing::info!("Starting MongoDB Sink Connector");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load properties from the TOML file plus ENV overrides
    let properties = load_properties().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let pipeline = SinkPipeline::from_properties(&properties)
        .context("Failed to assemble MongoDB sink pipeline")?;

    let connection = pipeline.connection();
    tracing::info!("Configuration loaded and validated successfully");
    tracing::info!("MongoDB URI: {}", connection.redacted_uri()?);
    tracing::info!("Collection: {}.{}", connection.database, connection.collection);
    tracing::info!("Document id strategy: {}", pipeline.config().id_strategy());

    for (idx, stage) in pipeline.chain().names().iter().enumerate() {
        tracing::info!("  Post processor {}: '{}'", idx + 1, stage);
    }

    let retries = pipeline.retry_settings();
    tracing::info!(
        "Write retries: {} (deferred {} ms)",
        retries.max_retries,
        retries.defer_timeout.as_millis()
    );

    Ok(())
}
