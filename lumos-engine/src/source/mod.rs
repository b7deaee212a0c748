///! Upstream schedule sources
///!
///! One implementation per region, each speaking its own wire format.
///! Both loops depend only on the [`ScheduleSource`] trait.

mod chernivtsi;
mod prykarpattia;

pub use chernivtsi::ChernivtsiSource;
pub use prykarpattia::PrykarpattiaSource;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourceEndpoints;
use lumos_core::schedule::ScheduleSnapshot;
use lumos_core::{Queue, Region};

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    fn region(&self) -> Region;

    /// Fetch the full set of dates the upstream currently publishes for
    /// one queue. Individual malformed dates or slots are skipped with a
    /// warning; only an unusable payload is an error.
    async fn fetch(&self, queue: Queue) -> Result<ScheduleSnapshot>;
}

/// Shared HTTP client for all sources and the dispatcher. The timeout
/// bounds every fetch so one slow upstream cannot stall a whole cycle.
pub fn build_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 Lumos-bot/1.0")
        .build()?;
    Ok(client)
}

pub fn source_for(
    region: Region,
    client: Client,
    endpoints: &SourceEndpoints,
) -> Arc<dyn ScheduleSource> {
    match region {
        Region::Prykarpattia => Arc::new(PrykarpattiaSource::new(
            client,
            endpoints.prykarpattia_url.clone(),
        )),
        Region::Chernivtsi => Arc::new(ChernivtsiSource::new(
            client,
            endpoints.chernivtsi_url.clone(),
        )),
    }
}
