///! Schedule snapshot model
///!
///! A snapshot is the full set of dates a source currently publishes for
///! one (region, queue), each with an ordered list of outage slots. An
///! empty slot list means "no outage planned" and is a meaningful,
///! diffable value; an absent date means the source offered no data.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Europe::Kyiv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Calendar date format used by the upstream sources, e.g. "20.01.2026".
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Wall-clock time format used by the upstream sources, e.g. "10:00".
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, thiserror::Error)]
pub enum ScheduleParseError {
    #[error("malformed date: {0}")]
    Date(String),
    #[error("malformed time: {0}")]
    Time(String),
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ScheduleParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| ScheduleParseError::Date(s.to_string()))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, ScheduleParseError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|_| ScheduleParseError::Time(s.to_string()))
}

/// Current wall-clock time in the fixed schedule timezone.
pub fn kyiv_now() -> NaiveDateTime {
    Utc::now().with_timezone(&Kyiv).naive_local()
}

/// Current calendar day in the fixed schedule timezone.
pub fn kyiv_today() -> NaiveDate {
    kyiv_now().date()
}

/// One contiguous outage interval within a single calendar date.
///
/// An `end` of 00:00 denotes the midnight roll-over: the outage runs to
/// the end of the day, never to 00:00 of the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutageSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OutageSlot {
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleParseError> {
        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    /// Minutes since midnight at which the outage ends, with 00:00
    /// interpreted as 24:00.
    pub fn end_minutes(&self) -> u32 {
        use chrono::Timelike;
        if self.end == NaiveTime::MIN {
            24 * 60
        } else {
            self.end.hour() * 60 + self.end.minute()
        }
    }
}

impl fmt::Display for OutageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

/// The full published schedule for one (region, queue) at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    days: BTreeMap<NaiveDate, Vec<OutageSlot>>,
}

impl ScheduleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the slot list offered for a date. An empty list is kept:
    /// "no outage" is data, unlike a date the source never mentioned.
    pub fn insert_day(&mut self, date: NaiveDate, slots: Vec<OutageSlot>) {
        self.days.insert(date, slots);
    }

    pub fn day(&self, date: &NaiveDate) -> Option<&[OutageSlot]> {
        self.days.get(date).map(Vec::as_slice)
    }

    /// Dates in ascending calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<OutageSlot>)> {
        self.days.iter()
    }

    /// Drop dates strictly before `earliest`. Sources occasionally keep
    /// offering a past date; it must not re-enter state after eviction.
    pub fn retain_from(&mut self, earliest: NaiveDate) {
        self.days.retain(|date, _| *date >= earliest);
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}
