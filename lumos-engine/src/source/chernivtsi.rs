///! Chernivtsi schedule API client
///!
///! This API answers `GET <url>?group=N.N` with the published dates as
///! top-level keys, each holding the requested group's intervals directly
///! (`begin`/`end` instead of Prykarpattia's `from`/`to`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

use super::ScheduleSource;
use lumos_core::schedule::{parse_date, OutageSlot, ScheduleSnapshot};
use lumos_core::{Queue, Region};

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    graphs: BTreeMap<String, Vec<RawInterval>>,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    begin: String,
    end: String,
}

pub(crate) fn parse_graphs_json(json: &str) -> Result<ScheduleSnapshot> {
    let resp: RawResponse =
        serde_json::from_str(json).context("Failed to deserialize Chernivtsi graphs JSON")?;

    let mut snapshot = ScheduleSnapshot::new();
    for (raw_date, intervals) in resp.graphs {
        let date = match parse_date(&raw_date) {
            Ok(date) => date,
            Err(e) => {
                warn!("Chernivtsi graph with bad date: {}", e);
                continue;
            }
        };
        let mut slots = Vec::with_capacity(intervals.len());
        for raw in &intervals {
            match OutageSlot::parse(&raw.begin, &raw.end) {
                Ok(slot) => slots.push(slot),
                Err(e) => warn!("Chernivtsi interval on {} skipped: {}", raw_date, e),
            }
        }
        snapshot.insert_day(date, slots);
    }
    Ok(snapshot)
}

pub struct ChernivtsiSource {
    client: Client,
    url: String,
}

impl ChernivtsiSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ScheduleSource for ChernivtsiSource {
    fn region(&self) -> Region {
        Region::Chernivtsi
    }

    async fn fetch(&self, queue: Queue) -> Result<ScheduleSnapshot> {
        let body = self
            .client
            .get(&self.url)
            .query(&[("group", queue.to_string())])
            .send()
            .await
            .context("Failed to GET Chernivtsi schedule")?
            .error_for_status()
            .context("Chernivtsi schedule API returned an error status")?
            .text()
            .await
            .context("Failed to read Chernivtsi response body")?;

        parse_graphs_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_keyed_graphs() {
        let json = r#"{
            "graphs": {
                "20.01.2026": [ { "begin": "09:00", "end": "12:00" } ],
                "21.01.2026": []
            }
        }"#;
        let snapshot = parse_graphs_json(json).unwrap();
        assert_eq!(snapshot.len(), 2);
        let day = snapshot.day(&parse_date("20.01.2026").unwrap()).unwrap();
        assert_eq!(day[0].to_string(), "09:00 - 12:00");
        assert!(snapshot
            .day(&parse_date("21.01.2026").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn bad_dates_and_intervals_are_skipped() {
        let json = r#"{
            "graphs": {
                "yesterday": [ { "begin": "09:00", "end": "12:00" } ],
                "20.01.2026": [ { "begin": "24:30", "end": "12:00" }, { "begin": "14:00", "end": "00:00" } ]
            }
        }"#;
        let snapshot = parse_graphs_json(json).unwrap();
        assert_eq!(snapshot.len(), 1);
        let day = snapshot.day(&parse_date("20.01.2026").unwrap()).unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].end_minutes(), 24 * 60);
    }
}
