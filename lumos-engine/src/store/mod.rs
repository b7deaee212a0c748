///! Persistent state access
///!
///! Two narrow interfaces: [`StateStore`] owns the poller's per-date
///! hashes and the reminder dedup facts; [`SubscriberStore`] exposes the
///! user records owned by the bot-facing side. Every write target is
///! keyed by (region, queue) or by the full reminder tuple, so the two
///! loops never race on the same key.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use lumos_core::reminder::ReminderKey;
use lumos_core::subscriber::Subscriber;
use lumos_core::{Queue, Region, UserId};

/// State key for one (region, queue). Queue identifiers repeat across
/// regions, so the region prefix is never optional.
pub fn state_key(region: Region, queue: Queue) -> String {
    format!("{}:{}", region.as_str(), queue)
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Per-date hashes observed at the last successful poll; empty when
    /// the pair has never been observed.
    async fn load_hashes(&self, region: Region, queue: Queue)
        -> Result<BTreeMap<NaiveDate, String>>;

    /// Replace the stored hashes for the pair (atomic upsert by key).
    async fn save_hashes(
        &self,
        region: Region,
        queue: Queue,
        hashes: &BTreeMap<NaiveDate, String>,
    ) -> Result<()>;

    async fn reminder_sent(&self, key: &ReminderKey) -> Result<bool>;

    async fn mark_reminder_sent(&self, key: &ReminderKey, at: NaiveDateTime) -> Result<()>;

    /// Drop reminder facts sent before `cutoff`. Returns how many were
    /// removed.
    async fn purge_reminders_before(&self, cutoff: NaiveDateTime) -> Result<usize>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Users following one (region, queue).
    async fn subscribers_of(&self, region: Region, queue: Queue) -> Result<Vec<UserId>>;

    /// Users eligible for reminders, with their preferences.
    async fn reminder_subscribers(&self) -> Result<Vec<(UserId, Subscriber)>>;
}
