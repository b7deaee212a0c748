///! Subscriber preferences
///!
///! Owned by the bot-facing collaborator; the engine only reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Queue, Region};

/// Lead-times (minutes) a user may pick from.
pub const LEAD_TIME_CATALOG: [u32; 6] = [5, 10, 15, 30, 60, 120];

/// Default lead-times for a fresh subscription, largest first.
pub const DEFAULT_LEAD_TIMES: [u32; 4] = [60, 30, 15, 5];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub region: Region,
    /// Followed queues, unique and unordered.
    #[serde(default)]
    pub queues: BTreeSet<Queue>,
    /// Free-text address label, display only.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_reminders")]
    pub reminders: bool,
    /// Configured lead-times in the user's preferred order.
    #[serde(default = "default_lead_times")]
    pub lead_times: Vec<u32>,
}

fn default_reminders() -> bool {
    true
}

fn default_lead_times() -> Vec<u32> {
    DEFAULT_LEAD_TIMES.to_vec()
}

impl Subscriber {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            queues: BTreeSet::new(),
            address: None,
            reminders: default_reminders(),
            lead_times: default_lead_times(),
        }
    }

    /// Whether the reminder scheduler should consider this user at all.
    pub fn wants_reminders(&self) -> bool {
        self.reminders && !self.queues.is_empty() && !self.lead_times.is_empty()
    }
}
