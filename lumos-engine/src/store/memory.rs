///! In-memory store
///!
///! Same atomic upsert-by-key semantics as the file store, without the
///! disk. Used by the engine tests and handy for a dry-run deployment.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{state_key, StateStore, SubscriberStore};
use lumos_core::reminder::ReminderKey;
use lumos_core::subscriber::Subscriber;
use lumos_core::{Queue, Region, UserId};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<HashMap<String, BTreeMap<NaiveDate, String>>>,
    reminders: Mutex<HashMap<String, NaiveDateTime>>,
    subscribers: Mutex<BTreeMap<UserId, Subscriber>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscriber(&self, user: UserId, subscriber: Subscriber) {
        self.subscribers.lock().unwrap().insert(user, subscriber);
    }

    pub fn reminder_fact_count(&self) -> usize {
        self.reminders.lock().unwrap().len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_hashes(
        &self,
        region: Region,
        queue: Queue,
    ) -> Result<BTreeMap<NaiveDate, String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .get(&state_key(region, queue))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_hashes(
        &self,
        region: Region,
        queue: Queue,
        hashes: &BTreeMap<NaiveDate, String>,
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .insert(state_key(region, queue), hashes.clone());
        Ok(())
    }

    async fn reminder_sent(&self, key: &ReminderKey) -> Result<bool> {
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .contains_key(&key.storage_key()))
    }

    async fn mark_reminder_sent(&self, key: &ReminderKey, at: NaiveDateTime) -> Result<()> {
        self.reminders.lock().unwrap().insert(key.storage_key(), at);
        Ok(())
    }

    async fn purge_reminders_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let mut reminders = self.reminders.lock().unwrap();
        let before = reminders.len();
        reminders.retain(|_, sent_at| *sent_at >= cutoff);
        Ok(before - reminders.len())
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn subscribers_of(&self, region: Region, queue: Queue) -> Result<Vec<UserId>> {
        Ok(self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, sub)| sub.region == region && sub.queues.contains(&queue))
            .map(|(user, _)| *user)
            .collect())
    }

    async fn reminder_subscribers(&self) -> Result<Vec<(UserId, Subscriber)>> {
        Ok(self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, sub)| sub.wants_reminders())
            .map(|(user, sub)| (*user, sub.clone()))
            .collect())
    }
}
