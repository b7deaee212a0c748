///! Outage queue identifiers
///!
///! Queues are published as "group.sub" strings ("1.1".."6.2"). The same
///! identifiers are reused literally in every region, so state keys must
///! always pair a queue with its region.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One rotating outage group within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Queue {
    group: u8,
    sub: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown queue identifier: {0}")]
pub struct ParseQueueError(String);

impl Queue {
    /// The fixed catalog of monitored queues.
    pub const ALL: [Queue; 12] = [
        Queue { group: 1, sub: 1 },
        Queue { group: 1, sub: 2 },
        Queue { group: 2, sub: 1 },
        Queue { group: 2, sub: 2 },
        Queue { group: 3, sub: 1 },
        Queue { group: 3, sub: 2 },
        Queue { group: 4, sub: 1 },
        Queue { group: 4, sub: 2 },
        Queue { group: 5, sub: 1 },
        Queue { group: 5, sub: 2 },
        Queue { group: 6, sub: 1 },
        Queue { group: 6, sub: 2 },
    ];

    pub fn group(&self) -> u8 {
        self.group
    }

    pub fn sub(&self) -> u8 {
        self.sub
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.sub)
    }
}

impl FromStr for Queue {
    type Err = ParseQueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s.split_once('.').and_then(|(g, q)| {
            let group = g.parse::<u8>().ok()?;
            let sub = q.parse::<u8>().ok()?;
            Some(Queue { group, sub })
        });
        // Only identifiers from the published catalog are valid.
        match parsed {
            Some(queue) if Queue::ALL.contains(&queue) => Ok(queue),
            _ => Err(ParseQueueError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Queue {
    type Error = ParseQueueError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Queue> for String {
    fn from(queue: Queue) -> Self {
        queue.to_string()
    }
}
