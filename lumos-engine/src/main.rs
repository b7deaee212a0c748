use std::sync::Arc;

use anyhow::Result;

use lumos_core::Region;
use lumos_engine::config;
use lumos_engine::dispatch::TelegramDispatcher;
use lumos_engine::logging;
use lumos_engine::monitor::{Monitor, MonitorConfig};
use lumos_engine::source;
use lumos_engine::store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    config::read_config()?;
    let config = config::CONFIG.get().unwrap();

    // Initialize logging
    let _logging_guard = logging::init_logging("logs", "lumos-engine", &config.log_level);

    tracing::info!("Lumos engine starting...");
    if config.bot_token.is_empty() {
        tracing::warn!("No bot token configured; notifications will fail to deliver");
    }

    // The state store is the only fatal bootstrap dependency.
    let store = Arc::new(FileStore::open(&config.data_dir).await?);

    let client = source::build_client()?;
    let sources: Vec<_> = Region::ALL
        .iter()
        .map(|region| source::source_for(*region, client.clone(), &config.sources))
        .collect();
    let dispatcher = Arc::new(TelegramDispatcher::new(
        client.clone(),
        config.bot_token.clone(),
    ));

    let mut monitor = Monitor::new(
        MonitorConfig::from_engine_config(config),
        sources,
        store.clone(),
        store,
        dispatcher,
    );
    monitor.start_all();
    tracing::info!("Monitoring {} regions", Region::ALL.len());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received.");
    monitor.shutdown().await;

    Ok(())
}
