///! Prykarpattia schedule API client
///!
///! The API answers `GET <url>?queue=N.N` with a record per published
///! date; each record carries the slot lists of every queue, keyed by the
///! queue identifier.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use super::ScheduleSource;
use lumos_core::schedule::{parse_date, OutageSlot, ScheduleSnapshot};
use lumos_core::{Queue, Region};

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    schedule: Vec<RawDay>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    #[serde(rename = "eventDate")]
    event_date: Option<String>,
    #[serde(default)]
    queues: HashMap<String, Vec<RawSlot>>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    from: String,
    to: String,
}

/// Parse the API JSON into a snapshot for one queue.
///
/// A record without a parsable date is dropped; a malformed slot is
/// dropped from its date. A date whose record exists but lists no slots
/// for the queue is kept as an empty day ("no outage").
pub(crate) fn parse_schedule_json(queue: Queue, json: &str) -> Result<ScheduleSnapshot> {
    let resp: RawResponse =
        serde_json::from_str(json).context("Failed to deserialize Prykarpattia schedule JSON")?;

    let mut snapshot = ScheduleSnapshot::new();
    for day in resp.schedule {
        let Some(raw_date) = day.event_date else {
            warn!("Prykarpattia record without eventDate, skipping");
            continue;
        };
        let date = match parse_date(&raw_date) {
            Ok(date) => date,
            Err(e) => {
                warn!("Prykarpattia record with bad date: {}", e);
                continue;
            }
        };

        let raw_slots = day.queues.get(&queue.to_string()).map(Vec::as_slice).unwrap_or(&[]);
        let mut slots = Vec::with_capacity(raw_slots.len());
        for raw in raw_slots {
            match OutageSlot::parse(&raw.from, &raw.to) {
                Ok(slot) => slots.push(slot),
                Err(e) => warn!("Prykarpattia slot on {} skipped: {}", raw_date, e),
            }
        }
        snapshot.insert_day(date, slots);
    }
    Ok(snapshot)
}

pub struct PrykarpattiaSource {
    client: Client,
    url: String,
}

impl PrykarpattiaSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ScheduleSource for PrykarpattiaSource {
    fn region(&self) -> Region {
        Region::Prykarpattia
    }

    async fn fetch(&self, queue: Queue) -> Result<ScheduleSnapshot> {
        let body = self
            .client
            .get(&self.url)
            .query(&[("queue", queue.to_string())])
            .send()
            .await
            .context("Failed to GET Prykarpattia schedule")?
            .error_for_status()
            .context("Prykarpattia schedule API returned an error status")?
            .text()
            .await
            .context("Failed to read Prykarpattia response body")?;

        parse_schedule_json(queue, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "current": { "hasQueue": "yes", "queue": 1, "subQueue": 1 },
        "schedule": [
            {
                "eventDate": "20.01.2026",
                "queues": {
                    "1.1": [ { "from": "10:00", "to": "14:00" }, { "from": "18:00", "to": "20:00" } ],
                    "1.2": [ { "from": "06:00", "to": "08:00" } ]
                }
            },
            {
                "eventDate": "21.01.2026",
                "queues": { "1.2": [ { "from": "12:00", "to": "16:00" } ] }
            }
        ]
    }"#;

    #[test]
    fn extracts_only_the_requested_queue() {
        let queue: Queue = "1.1".parse().unwrap();
        let snapshot = parse_schedule_json(queue, SAMPLE).unwrap();
        assert_eq!(snapshot.len(), 2);

        let day = snapshot.day(&parse_date("20.01.2026").unwrap()).unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].to_string(), "10:00 - 14:00");

        // 21.01 lists nothing for 1.1: offered date, no outage.
        let day = snapshot.day(&parse_date("21.01.2026").unwrap()).unwrap();
        assert!(day.is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let json = r#"{
            "schedule": [
                { "eventDate": "not-a-date", "queues": { "1.1": [] } },
                { "queues": { "1.1": [] } },
                {
                    "eventDate": "20.01.2026",
                    "queues": { "1.1": [ { "from": "10:00", "to": "oops" }, { "from": "18:00", "to": "20:00" } ] }
                }
            ]
        }"#;
        let queue: Queue = "1.1".parse().unwrap();
        let snapshot = parse_schedule_json(queue, json).unwrap();
        assert_eq!(snapshot.len(), 1);
        let day = snapshot.day(&parse_date("20.01.2026").unwrap()).unwrap();
        assert_eq!(day.len(), 1);
    }

    #[test]
    fn unusable_payload_is_an_error() {
        let queue: Queue = "1.1".parse().unwrap();
        assert!(parse_schedule_json(queue, "<html>busy</html>").is_err());
    }
}
