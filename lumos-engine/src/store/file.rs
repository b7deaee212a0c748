///! JSON-file state store
///!
///! Three documents under the data directory, loaded once at startup and
///! flushed whole on every write. Date keys use the external DD.MM.YYYY
///! format so the files stay readable next to the upstream payloads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{state_key, StateStore, SubscriberStore};
use lumos_core::reminder::ReminderKey;
use lumos_core::schedule::{kyiv_now, parse_date, DATE_FORMAT};
use lumos_core::subscriber::Subscriber;
use lumos_core::{Queue, Region, UserId};

const STATE_FILE: &str = "schedule_state.json";
const REMINDERS_FILE: &str = "sent_reminders.json";
const SUBSCRIBERS_FILE: &str = "subscribers.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateRecord {
    /// Date (DD.MM.YYYY) → content hash.
    hashes: BTreeMap<String, String>,
    updated_at: NaiveDateTime,
}

type StateDoc = BTreeMap<String, StateRecord>;
/// Reminder storage key → sent-at timestamp.
type ReminderDoc = BTreeMap<String, NaiveDateTime>;
/// User id (decimal string, JSON keys must be strings) → preferences.
type SubscriberDoc = BTreeMap<String, Subscriber>;

pub struct FileStore {
    dir: PathBuf,
    state: RwLock<StateDoc>,
    reminders: RwLock<ReminderDoc>,
    subscribers: RwLock<SubscriberDoc>,
}

async fn load_doc<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(doc)
}

async fn save_doc<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(doc).context("Failed to serialize document")?;
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl FileStore {
    /// Open the store, creating the data directory and loading whatever
    /// documents already exist. Failure here is a bootstrap failure.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        let state: StateDoc = load_doc(&dir.join(STATE_FILE)).await?;
        let reminders: ReminderDoc = load_doc(&dir.join(REMINDERS_FILE)).await?;
        let subscribers: SubscriberDoc = load_doc(&dir.join(SUBSCRIBERS_FILE)).await?;

        info!(
            "State store opened: {} schedule records, {} reminder facts, {} subscribers",
            state.len(),
            reminders.len(),
            subscribers.len()
        );

        Ok(Self {
            dir,
            state: RwLock::new(state),
            reminders: RwLock::new(reminders),
            subscribers: RwLock::new(subscribers),
        })
    }

    /// Create or replace a user record. Called from the bot-facing side;
    /// the engine itself only reads subscribers.
    pub async fn upsert_subscriber(&self, user: UserId, subscriber: Subscriber) -> Result<()> {
        let mut doc = self.subscribers.write().await;
        doc.insert(user.to_string(), subscriber);
        save_doc(&self.dir.join(SUBSCRIBERS_FILE), &*doc).await
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load_hashes(
        &self,
        region: Region,
        queue: Queue,
    ) -> Result<BTreeMap<NaiveDate, String>> {
        let doc = self.state.read().await;
        let Some(record) = doc.get(&state_key(region, queue)) else {
            return Ok(BTreeMap::new());
        };
        let mut hashes = BTreeMap::new();
        for (raw_date, hash) in &record.hashes {
            match parse_date(raw_date) {
                Ok(date) => {
                    hashes.insert(date, hash.clone());
                }
                Err(e) => warn!("Dropping stored state with bad date key: {}", e),
            }
        }
        Ok(hashes)
    }

    async fn save_hashes(
        &self,
        region: Region,
        queue: Queue,
        hashes: &BTreeMap<NaiveDate, String>,
    ) -> Result<()> {
        let record = StateRecord {
            hashes: hashes
                .iter()
                .map(|(date, hash)| (date.format(DATE_FORMAT).to_string(), hash.clone()))
                .collect(),
            updated_at: kyiv_now(),
        };
        let mut doc = self.state.write().await;
        doc.insert(state_key(region, queue), record);
        save_doc(&self.dir.join(STATE_FILE), &*doc).await
    }

    async fn reminder_sent(&self, key: &ReminderKey) -> Result<bool> {
        Ok(self.reminders.read().await.contains_key(&key.storage_key()))
    }

    async fn mark_reminder_sent(&self, key: &ReminderKey, at: NaiveDateTime) -> Result<()> {
        let mut doc = self.reminders.write().await;
        doc.insert(key.storage_key(), at);
        save_doc(&self.dir.join(REMINDERS_FILE), &*doc).await
    }

    async fn purge_reminders_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let mut doc = self.reminders.write().await;
        let before = doc.len();
        doc.retain(|_, sent_at| *sent_at >= cutoff);
        let removed = before - doc.len();
        if removed > 0 {
            save_doc(&self.dir.join(REMINDERS_FILE), &*doc).await?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl SubscriberStore for FileStore {
    async fn subscribers_of(&self, region: Region, queue: Queue) -> Result<Vec<UserId>> {
        let doc = self.subscribers.read().await;
        let mut users = Vec::new();
        for (raw_id, subscriber) in doc.iter() {
            if subscriber.region == region && subscriber.queues.contains(&queue) {
                match raw_id.parse::<UserId>() {
                    Ok(user) => users.push(user),
                    Err(_) => warn!("Subscriber record with bad user id: {}", raw_id),
                }
            }
        }
        Ok(users)
    }

    async fn reminder_subscribers(&self) -> Result<Vec<(UserId, Subscriber)>> {
        let doc = self.subscribers.read().await;
        let mut users = Vec::new();
        for (raw_id, subscriber) in doc.iter() {
            if subscriber.wants_reminders() {
                if let Ok(user) = raw_id.parse::<UserId>() {
                    users.push((user, subscriber.clone()));
                }
            }
        }
        Ok(users)
    }
}
